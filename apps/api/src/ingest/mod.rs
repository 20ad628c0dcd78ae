//! Ingestion pipeline: load documents → chunk → embed → persist the index.
//!
//! Runs as a one-shot batch, offline from user queries. Duplicate policy is
//! clear-and-rebuild: each run builds a fresh index and replaces the
//! persisted one only after the whole batch (embedding included) succeeded,
//! so re-running over unchanged documents never grows the index and a
//! failed run leaves the previous index intact.

pub mod chunker;
pub mod handlers;
pub mod loader;

use std::path::Path;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::embedder::Embedder;
use crate::errors::AppError;
use crate::index::{DocumentChunk, VectorIndex};
use self::chunker::{chunk_text, CHUNK_OVERLAP, CHUNK_SIZE};

/// Human-readable ingestion summary.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub documents_loaded: usize,
    pub documents_skipped: usize,
    pub chunks_indexed: usize,
    pub embedding_model: String,
}

/// Runs the full pipeline and persists the result to `index_dir`.
/// Returns the freshly built index so the caller can swap it into state.
pub async fn run_ingestion(
    jobs_dir: &Path,
    embedder: &dyn Embedder,
    index_dir: &Path,
) -> Result<(VectorIndex, IngestReport), AppError> {
    let loaded = loader::load_documents(jobs_dir)?;

    let mut chunks: Vec<DocumentChunk> = Vec::new();
    for doc in &loaded.documents {
        for (seq, text) in chunk_text(&doc.text, CHUNK_SIZE, CHUNK_OVERLAP)
            .into_iter()
            .enumerate()
        {
            chunks.push(DocumentChunk {
                id: Uuid::new_v4(),
                text,
                source: doc.source.clone(),
                seq,
            });
        }
    }
    info!(
        "Chunked {} documents into {} chunks",
        loaded.documents.len(),
        chunks.len()
    );

    // Embedding failure aborts the run here, before the old index is touched.
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed(&texts).await?;
    if embeddings.len() != chunks.len() {
        return Err(AppError::Embedding(format!(
            "embedder returned {} vectors for {} chunks",
            embeddings.len(),
            chunks.len()
        )));
    }

    let mut index = VectorIndex::new(embedder.model_name());
    for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
        index.push(chunk, embedding)?;
    }
    index.persist(index_dir)?;

    let report = IngestReport {
        documents_loaded: loaded.documents.len(),
        documents_skipped: loaded.skipped,
        chunks_indexed: index.len(),
        embedding_model: embedder.model_name().to_string(),
    };
    info!(
        "Ingestion complete: {} documents, {} skipped, {} chunks indexed",
        report.documents_loaded, report.documents_skipped, report.chunks_indexed
    );
    Ok((index, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::testing::{FailingEmbedder, HashEmbedder};

    fn write_jobs(dir: &Path, files: &[(&str, &str)]) {
        for (name, content) in files {
            std::fs::write(dir.join(name), content).unwrap();
        }
    }

    #[tokio::test]
    async fn test_every_parsed_document_gets_at_least_one_entry() {
        let jobs = tempfile::tempdir().unwrap();
        let index_dir = tempfile::tempdir().unwrap();
        write_jobs(
            jobs.path(),
            &[
                ("backend.txt", "Requires Python and Docker experience."),
                ("frontend.txt", "Requires React and TypeScript."),
            ],
        );

        let (index, report) = run_ingestion(jobs.path(), &HashEmbedder, index_dir.path())
            .await
            .unwrap();

        assert_eq!(report.documents_loaded, 2);
        assert_eq!(report.documents_skipped, 0);
        assert!(report.chunks_indexed >= 2);
        assert_eq!(index.len(), report.chunks_indexed);

        let hits = index.search(&HashEmbedder::embed_one("docker python"), 10);
        let sources: Vec<_> = hits.iter().map(|h| h.chunk.source.as_str()).collect();
        assert!(sources.contains(&"backend.txt"));
        assert!(sources.contains(&"frontend.txt"));
    }

    #[tokio::test]
    async fn test_bad_file_is_skipped_and_batch_continues() {
        let jobs = tempfile::tempdir().unwrap();
        let index_dir = tempfile::tempdir().unwrap();
        write_jobs(jobs.path(), &[("good.txt", "Requires Kubernetes.")]);
        std::fs::write(jobs.path().join("broken.pdf"), b"garbage bytes").unwrap();

        let (_, report) = run_ingestion(jobs.path(), &HashEmbedder, index_dir.path())
            .await
            .unwrap();

        assert_eq!(report.documents_loaded, 1);
        assert_eq!(report.documents_skipped, 1);
        assert!(report.chunks_indexed >= 1);
    }

    #[tokio::test]
    async fn test_missing_jobs_dir_is_fatal() {
        let index_dir = tempfile::tempdir().unwrap();
        let err = run_ingestion(
            Path::new("/definitely/not/a/real/dir"),
            &HashEmbedder,
            index_dir.path(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_embedder_failure_aborts_and_preserves_existing_index() {
        let jobs = tempfile::tempdir().unwrap();
        let index_dir = tempfile::tempdir().unwrap();
        write_jobs(jobs.path(), &[("job.txt", "Requires Rust.")]);

        let (first, _) = run_ingestion(jobs.path(), &HashEmbedder, index_dir.path())
            .await
            .unwrap();
        let entries_before = first.len();

        let err = run_ingestion(jobs.path(), &FailingEmbedder, index_dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));

        let persisted = VectorIndex::load(index_dir.path()).unwrap().unwrap();
        assert_eq!(persisted.len(), entries_before);
        assert_eq!(persisted.embedding_model(), "hash-embedder-test");
    }

    #[tokio::test]
    async fn test_reingestion_is_idempotent_for_retrieval() {
        let jobs = tempfile::tempdir().unwrap();
        let index_dir = tempfile::tempdir().unwrap();
        write_jobs(
            jobs.path(),
            &[
                ("a.txt", "Requires Python and Docker experience."),
                ("b.txt", "Looking for a florist with tulip skills."),
            ],
        );

        let query = HashEmbedder::embed_one("docker python backend");

        let (first, first_report) = run_ingestion(jobs.path(), &HashEmbedder, index_dir.path())
            .await
            .unwrap();
        let (second, second_report) = run_ingestion(jobs.path(), &HashEmbedder, index_dir.path())
            .await
            .unwrap();

        assert_eq!(first_report.chunks_indexed, second_report.chunks_indexed);

        let before: Vec<_> = first
            .search(&query, 5)
            .into_iter()
            .map(|h| (h.chunk.source, h.chunk.text))
            .collect();
        let after: Vec<_> = second
            .search(&query, 5)
            .into_iter()
            .map(|h| (h.chunk.source, h.chunk.text))
            .collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_empty_jobs_dir_builds_an_empty_index() {
        let jobs = tempfile::tempdir().unwrap();
        let index_dir = tempfile::tempdir().unwrap();

        let (index, report) = run_ingestion(jobs.path(), &HashEmbedder, index_dir.path())
            .await
            .unwrap();
        assert!(index.is_empty());
        assert_eq!(report.documents_loaded, 0);
        assert_eq!(report.chunks_indexed, 0);
    }
}
