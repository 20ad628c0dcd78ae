//! Retrieval-augmented gap analysis — the query-time flow.
//!
//! Five steps, each independently testable: build a query string from the
//! role, embed it with the same model as ingestion, search the index,
//! assemble the prompt, call the generation model. The flow never mutates
//! the index, and an empty index degrades to a best-effort analysis rather
//! than an error.

pub mod handlers;
pub mod prompts;

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::embedder::Embedder;
use crate::errors::AppError;
use crate::index::VectorIndex;
use crate::llm_client::CompletionModel;
use self::prompts::{build_analysis_prompt, GAP_ANALYSIS_SYSTEM};

/// Chunks retrieved per query.
pub const RETRIEVAL_K: usize = 5;

/// Deterministic query string for a target role. The boilerplate biases
/// the embedding toward requirement language rather than the bare title.
pub fn build_query(role: &str) -> String {
    format!("{} job requirements and qualifications", role.trim())
}

/// Result of one analysis run. The analysis text is the model's output
/// verbatim; `retrieved_sources` traces it back to the postings that
/// grounded it.
#[derive(Debug, Clone, Serialize)]
pub struct GapReport {
    pub analysis: String,
    pub retrieved_sources: Vec<String>,
    pub market_data_available: bool,
}

/// The query-flow engine. Holds the same `Embedder` instance ingestion
/// uses, and reaches the generation model only through `CompletionModel`.
#[derive(Clone)]
pub struct GapAnalyzer {
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn CompletionModel>,
}

impl GapAnalyzer {
    pub fn new(embedder: Arc<dyn Embedder>, model: Arc<dyn CompletionModel>) -> Self {
        Self { embedder, model }
    }

    pub async fn analyze(
        &self,
        index: &VectorIndex,
        role: &str,
        resume: &str,
    ) -> Result<GapReport, AppError> {
        // Query embeddings must come from the model that built the index.
        if !index.is_empty() && index.embedding_model() != self.embedder.model_name() {
            return Err(AppError::Index(format!(
                "index was built with '{}' but the configured embedder is '{}'; re-run ingestion",
                index.embedding_model(),
                self.embedder.model_name()
            )));
        }

        let query = build_query(role);
        let query_embedding = self
            .embedder
            .embed(&[query])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding("embedder returned no vector".to_string()))?;

        let retrieved = index.search(&query_embedding, RETRIEVAL_K);
        debug!("Retrieved {} chunks for role '{}'", retrieved.len(), role);
        if let Some(top) = retrieved.first() {
            debug!("Top hit: {} (score {:.3})", top.chunk.source, top.score);
        }

        let prompt = build_analysis_prompt(role, &retrieved, resume);
        let analysis = self.model.complete(GAP_ANALYSIS_SYSTEM, &prompt).await?;

        let mut retrieved_sources: Vec<String> = Vec::new();
        for hit in &retrieved {
            if !retrieved_sources.contains(&hit.chunk.source) {
                retrieved_sources.push(hit.chunk.source.clone());
            }
        }

        Ok(GapReport {
            analysis,
            market_data_available: !retrieved.is_empty(),
            retrieved_sources,
        })
    }
}
