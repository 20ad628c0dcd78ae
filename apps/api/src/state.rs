use std::sync::Arc;

use tokio::sync::RwLock;

use crate::analysis::GapAnalyzer;
use crate::config::Config;
use crate::embedder::Embedder;
use crate::index::VectorIndex;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The vector index. Single writer (ingestion, which swaps a freshly
    /// built index in under the write lock); the query flow only reads.
    pub index: Arc<RwLock<VectorIndex>>,
    /// Shared by ingestion and the query flow — both sides must embed with
    /// the same model or retrieval silently degrades.
    pub embedder: Arc<dyn Embedder>,
    /// The query-flow engine (embed → search → prompt → generate).
    pub analyzer: GapAnalyzer,
    pub config: Config,
}
