//! Document loading — reads job postings from disk and extracts plain text.
//!
//! Supported inputs: `.txt` (UTF-8) and `.pdf` (via `pdf-extract`). A file
//! that fails to read or parse is skipped with a warning; only a missing
//! input directory aborts the batch.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::errors::AppError;

/// One successfully extracted source document.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// File name, carried through as chunk metadata.
    pub source: String,
    pub text: String,
}

#[derive(Debug)]
pub struct LoadResult {
    pub documents: Vec<LoadedDocument>,
    /// Files that matched a supported extension but could not be used.
    pub skipped: usize,
}

/// Loads every supported file directly under `dir`, in file-name order.
pub fn load_documents(dir: &Path) -> Result<LoadResult, AppError> {
    if !dir.is_dir() {
        return Err(AppError::Validation(format!(
            "jobs directory not found: {}",
            dir.display()
        )));
    }

    let mut paths: Vec<_> = fs::read_dir(dir)
        .map_err(|e| AppError::Validation(format!("cannot read {}: {e}", dir.display())))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| matches!(extension_of(p).as_deref(), Some("txt") | Some("pdf")))
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    let mut skipped = 0;

    for path in paths {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let text = match extension_of(&path).as_deref() {
            Some("txt") => fs::read_to_string(&path).map_err(|e| e.to_string()),
            Some("pdf") => pdf_extract::extract_text(&path).map_err(|e| e.to_string()),
            _ => unreachable!("filtered above"),
        };

        match text {
            Ok(text) if !text.trim().is_empty() => {
                documents.push(LoadedDocument { source, text });
            }
            Ok(_) => {
                warn!("Skipping {source}: no extractable text");
                skipped += 1;
            }
            Err(e) => {
                warn!("Skipping {source}: {e}");
                skipped += 1;
            }
        }
    }

    info!(
        "Loaded {} documents from {} ({} skipped)",
        documents.len(),
        dir.display(),
        skipped
    );
    Ok(LoadResult { documents, skipped })
}

/// Extracts text from an uploaded resume: PDFs go through `pdf-extract`,
/// anything else is treated as UTF-8 text.
pub fn extract_uploaded_text(file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
    let is_pdf = file_name.to_lowercase().ends_with(".pdf")
        || bytes.starts_with(b"%PDF");

    let text = if is_pdf {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| AppError::Validation(format!("could not parse PDF '{file_name}': {e}")))?
    } else {
        String::from_utf8(bytes.to_vec())
            .map_err(|_| AppError::Validation(format!("'{file_name}' is not valid UTF-8 text")))?
    };

    if text.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "no extractable text in '{file_name}'"
        )));
    }
    Ok(text)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}
