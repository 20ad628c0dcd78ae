//! Embedder — the seam between the pipelines and the embedding model.
//!
//! Ingestion and the query flow MUST share one `Embedder` instance: the
//! model recorded in the index metadata has to match the model embedding
//! queries, or retrieval silently degrades. `AppState` holds an
//! `Arc<dyn Embedder>` so tests swap in a deterministic double.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;

/// Texts per request against the embeddings endpoint.
const EMBED_BATCH_SIZE: usize = 64;
const MAX_ATTEMPTS: u32 = 2;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model, recorded in the index metadata.
    fn model_name(&self) -> &str;

    /// Embeds each text into a fixed-dimensional vector, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Embeddings client for OpenAI-compatible `/embeddings` endpoints
/// (a local all-MiniLM server in development, any hosted one in production).
#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(base_url: &str, model: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model,
            api_key,
        }
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let request_body = EmbeddingRequest {
            model: &self.model,
            input: batch,
        };

        let mut last_error: Option<AppError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            }

            let mut request = self.client.post(&self.endpoint).json(&request_body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(AppError::Embedding(e.to_string()));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Embeddings API returned {}: {}", status, body);
                last_error = Some(AppError::Embedding(format!("status {status}: {body}")));
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::Embedding(format!("status {status}: {body}")));
            }

            let mut parsed: EmbeddingResponse = response
                .json()
                .await
                .map_err(|e| AppError::Embedding(format!("malformed response: {e}")))?;

            // The API may reorder results; `index` restores input order.
            parsed.data.sort_by_key(|d| d.index);

            if parsed.data.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "got {} embeddings for {} inputs",
                    parsed.data.len(),
                    batch.len()
                )));
            }

            return Ok(parsed.data.into_iter().map(|d| d.embedding).collect());
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Embedding("request attempts exhausted".to_string())))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}
