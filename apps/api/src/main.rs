mod analysis;
mod config;
mod embedder;
mod errors;
mod index;
mod ingest;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::GapAnalyzer;
use crate::config::Config;
use crate::embedder::{Embedder, HttpEmbedder};
use crate::index::VectorIndex;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Skillgap API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the embedding client (shared by ingestion and queries)
    let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(
        &config.embeddings_url,
        config.embeddings_model.clone(),
        config.embeddings_api_key.clone(),
    ));
    info!("Embedder initialized (model: {})", embedder.model_name());

    // Initialize LLM client
    let llm = Arc::new(LlmClient::new(config.anthropic_api_key.clone()));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Open the persisted vector index, or start empty on first run.
    // An index built with a different embedding model is unusable —
    // refuse to start rather than serve degraded retrieval.
    let index = match VectorIndex::load(&config.index_dir)? {
        Some(index) => {
            if index.embedding_model() != embedder.model_name() {
                anyhow::bail!(
                    "index at {} was built with '{}' but EMBEDDINGS_MODEL is '{}'; \
                     re-run ingestion or restore the matching model",
                    config.index_dir.display(),
                    index.embedding_model(),
                    embedder.model_name()
                );
            }
            info!("Loaded vector index: {} chunks", index.len());
            index
        }
        None => {
            warn!(
                "No vector index at {} — POST /api/v1/ingest to build one",
                config.index_dir.display()
            );
            VectorIndex::new(embedder.model_name())
        }
    };

    // Build app state
    let state = AppState {
        index: Arc::new(RwLock::new(index)),
        embedder: embedder.clone(),
        analyzer: GapAnalyzer::new(embedder, llm),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
