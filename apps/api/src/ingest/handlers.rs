//! Axum route handler for the ingestion API.

use axum::{extract::State, Json};
use tracing::info;

use crate::errors::AppError;
use crate::ingest::{run_ingestion, IngestReport};
use crate::state::AppState;

/// POST /api/v1/ingest
///
/// Rebuilds the vector index from the configured jobs directory and swaps
/// it into shared state. Queries keep reading the previous index until the
/// rebuild has fully succeeded.
pub async fn handle_ingest(State(state): State<AppState>) -> Result<Json<IngestReport>, AppError> {
    let (index, report) = run_ingestion(
        &state.config.jobs_dir,
        state.embedder.as_ref(),
        &state.config.index_dir,
    )
    .await?;

    *state.index.write().await = index;
    info!("Vector index rebuilt: {} chunks", report.chunks_indexed);

    Ok(Json(report))
}
