pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis_handlers;
use crate::ingest::handlers as ingest_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Ingestion API — rebuilds the vector index from the jobs directory
        .route("/api/v1/ingest", post(ingest_handlers::handle_ingest))
        // Analysis API — retrieval-augmented gap reports
        .route("/api/v1/analyze", post(analysis_handlers::handle_analyze))
        .route(
            "/api/v1/analyze/upload",
            post(analysis_handlers::handle_analyze_upload),
        )
        .route(
            "/api/v1/index/stats",
            get(analysis_handlers::handle_index_stats),
        )
        .with_state(state)
}
