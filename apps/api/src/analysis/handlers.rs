//! Axum route handlers for the analysis API.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;

use crate::analysis::GapReport;
use crate::errors::AppError;
use crate::index::IndexMeta;
use crate::ingest::loader::extract_uploaded_text;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub role: String,
    pub resume: String,
}

/// POST /api/v1/analyze
///
/// Runs the full retrieval-augmented flow for a (role, resume) pair and
/// returns the gap report.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<GapReport>, AppError> {
    if request.role.trim().is_empty() {
        return Err(AppError::Validation("role cannot be empty".to_string()));
    }
    if request.resume.trim().is_empty() {
        return Err(AppError::Validation("resume cannot be empty".to_string()));
    }

    let index = state.index.read().await;
    let report = state
        .analyzer
        .analyze(&index, request.role.trim(), &request.resume)
        .await?;

    Ok(Json(report))
}

/// POST /api/v1/analyze/upload
///
/// Multipart variant: a `role` text field plus a `resume` file (.pdf or
/// .txt). The file is extracted server-side, then the flow is identical to
/// `handle_analyze`.
pub async fn handle_analyze_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GapReport>, AppError> {
    let mut role: Option<String> = None;
    let mut resume: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart request: {e}")))?
    {
        match field.name() {
            Some("role") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("unreadable 'role' field: {e}")))?;
                role = Some(text);
            }
            Some("resume") => {
                let file_name = field.file_name().unwrap_or("resume.txt").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("unreadable 'resume' field: {e}")))?;
                resume = Some(extract_uploaded_text(&file_name, &bytes)?);
            }
            _ => {}
        }
    }

    let role = role
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| AppError::Validation("missing 'role' field".to_string()))?;
    let resume = resume
        .ok_or_else(|| AppError::Validation("missing 'resume' file field".to_string()))?;

    let index = state.index.read().await;
    let report = state.analyzer.analyze(&index, role.trim(), &resume).await?;

    Ok(Json(report))
}

/// GET /api/v1/index/stats
///
/// Reports what the index currently holds: entry count, dimensionality,
/// embedding model identity, and build time.
pub async fn handle_index_stats(State(state): State<AppState>) -> Json<IndexMeta> {
    Json(state.index.read().await.meta())
}
