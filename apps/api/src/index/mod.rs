//! Persistent vector index over job-posting chunks.
//!
//! The index is an explicitly constructed object passed into both pipelines:
//! ingestion is its sole writer, the query flow its sole reader. On disk it
//! is a bincode entries file plus a `meta.json` sidecar recording the
//! embedding model identity, so a model change between ingestion and query
//! time is caught instead of silently degrading retrieval.
//!
//! Search is a brute-force cosine scan: vectors are normalized at insert,
//! so scoring is a plain dot product. At a few thousand chunks this is far
//! from the bottleneck — the external model calls are.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

const ENTRIES_FILE: &str = "entries.bin";
const META_FILE: &str = "meta.json";

/// A contiguous span of text extracted from one source document.
/// Immutable once created; superseded wholesale by re-ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub text: String,
    /// Source file name — traces a retrieved chunk back to its posting.
    pub source: String,
    /// Sequence position within the source document.
    pub seq: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    chunk: DocumentChunk,
    /// Normalized at insert.
    embedding: Vec<f32>,
}

/// Sidecar metadata persisted as `meta.json` beside the entries file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub embedding_model: String,
    pub dimensions: usize,
    pub entry_count: usize,
    pub built_at: DateTime<Utc>,
}

/// One search hit: similarity score plus the stored chunk.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub score: f32,
    pub chunk: DocumentChunk,
}

#[derive(Debug)]
pub struct VectorIndex {
    embedding_model: String,
    /// 0 until the first entry fixes the dimensionality.
    dimensions: usize,
    built_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(embedding_model: &str) -> Self {
        Self {
            embedding_model: embedding_model.to_string(),
            dimensions: 0,
            built_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn meta(&self) -> IndexMeta {
        IndexMeta {
            embedding_model: self.embedding_model.clone(),
            dimensions: self.dimensions,
            entry_count: self.entries.len(),
            built_at: self.built_at,
        }
    }

    /// Appends a chunk with its embedding. The first entry fixes the index
    /// dimensionality; later entries must match it.
    pub fn push(&mut self, chunk: DocumentChunk, mut embedding: Vec<f32>) -> Result<(), AppError> {
        if self.dimensions == 0 {
            self.dimensions = embedding.len();
        } else if embedding.len() != self.dimensions {
            return Err(AppError::Index(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                embedding.len()
            )));
        }
        normalize(&mut embedding);
        self.entries.push(IndexEntry { chunk, embedding });
        Ok(())
    }

    /// Top-k most similar chunks by cosine similarity, descending. Returns
    /// fewer than `k` (possibly zero) results on a small or empty index.
    /// Ties keep insertion order (stable sort); the ordering among ties is
    /// not semantically significant.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<RetrievedChunk> {
        let mut query = query.to_vec();
        normalize(&mut query);

        let mut hits: Vec<RetrievedChunk> = self
            .entries
            .iter()
            .map(|entry| RetrievedChunk {
                score: dot(&query, &entry.embedding),
                chunk: entry.chunk.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }

    /// Writes the index to `dir`, replacing whatever was there. Files are
    /// written to temp names first and renamed, so a crash mid-persist
    /// leaves the previous index readable.
    pub fn persist(&self, dir: &Path) -> Result<(), AppError> {
        fs::create_dir_all(dir)
            .map_err(|e| AppError::Index(format!("cannot create {}: {e}", dir.display())))?;

        let entries_bytes = bincode::serialize(&self.entries)
            .map_err(|e| AppError::Index(format!("entry serialization failed: {e}")))?;
        let meta_bytes = serde_json::to_vec_pretty(&self.meta())
            .map_err(|e| AppError::Index(format!("meta serialization failed: {e}")))?;

        write_atomic(&dir.join(ENTRIES_FILE), &entries_bytes)?;
        write_atomic(&dir.join(META_FILE), &meta_bytes)?;
        Ok(())
    }

    /// Loads a previously persisted index. `Ok(None)` when none exists yet
    /// (first run); corrupt files are errors.
    pub fn load(dir: &Path) -> Result<Option<Self>, AppError> {
        let meta_path = dir.join(META_FILE);
        if !meta_path.exists() {
            return Ok(None);
        }

        let meta_bytes = fs::read(&meta_path)
            .map_err(|e| AppError::Index(format!("cannot read {}: {e}", meta_path.display())))?;
        let meta: IndexMeta = serde_json::from_slice(&meta_bytes)
            .map_err(|e| AppError::Index(format!("corrupt index meta: {e}")))?;

        let entries_path = dir.join(ENTRIES_FILE);
        let entries_bytes = fs::read(&entries_path)
            .map_err(|e| AppError::Index(format!("cannot read {}: {e}", entries_path.display())))?;
        let entries: Vec<IndexEntry> = bincode::deserialize(&entries_bytes)
            .map_err(|e| AppError::Index(format!("corrupt index entries: {e}")))?;

        if entries.len() != meta.entry_count {
            return Err(AppError::Index(format!(
                "index meta claims {} entries, file holds {}",
                meta.entry_count,
                entries.len()
            )));
        }

        Ok(Some(Self {
            embedding_model: meta.embedding_model,
            dimensions: meta.dimensions,
            built_at: meta.built_at,
            entries,
        }))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)
        .map_err(|e| AppError::Index(format!("cannot write {}: {e}", tmp.display())))?;
    fs::rename(&tmp, path)
        .map_err(|e| AppError::Index(format!("cannot replace {}: {e}", path.display())))?;
    Ok(())
}

fn normalize(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|&x| x * x).sum::<f32>().sqrt();
    if magnitude > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_chunk(text: &str, source: &str, seq: usize) -> DocumentChunk {
        DocumentChunk {
            id: Uuid::new_v4(),
            text: text.to_string(),
            source: source.to_string(),
            seq,
        }
    }

    #[test]
    fn test_search_ranks_by_cosine_similarity() {
        let mut index = VectorIndex::new("test-model");
        index
            .push(make_chunk("exact", "a.txt", 0), vec![1.0, 0.0, 0.0])
            .unwrap();
        index
            .push(make_chunk("near", "b.txt", 0), vec![0.8, 0.6, 0.0])
            .unwrap();
        index
            .push(make_chunk("far", "c.txt", 0), vec![0.0, 0.0, 1.0])
            .unwrap();

        let hits = index.search(&[1.0, 0.0, 0.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "exact");
        assert_eq!(hits[1].chunk.text, "near");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_search_is_scale_invariant() {
        let mut index = VectorIndex::new("test-model");
        index
            .push(make_chunk("scaled", "a.txt", 0), vec![10.0, 0.0])
            .unwrap();

        let hits = index.search(&[0.001, 0.0], 1);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = VectorIndex::new("test-model");
        index
            .push(make_chunk("first", "a.txt", 0), vec![1.0, 0.0])
            .unwrap();
        index
            .push(make_chunk("second", "a.txt", 1), vec![1.0, 0.0])
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 2);
        assert_eq!(hits[0].chunk.text, "first");
        assert_eq!(hits[1].chunk.text, "second");
    }

    #[test]
    fn test_empty_index_returns_zero_results_without_error() {
        let index = VectorIndex::new("test-model");
        assert!(index.search(&[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_k_larger_than_index_returns_all() {
        let mut index = VectorIndex::new("test-model");
        index
            .push(make_chunk("only", "a.txt", 0), vec![1.0, 0.0])
            .unwrap();
        assert_eq!(index.search(&[1.0, 0.0], 50).len(), 1);
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let mut index = VectorIndex::new("test-model");
        index
            .push(make_chunk("a", "a.txt", 0), vec![1.0, 0.0])
            .unwrap();
        let err = index
            .push(make_chunk("b", "b.txt", 0), vec![1.0, 0.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, AppError::Index(_)));
    }

    #[test]
    fn test_persist_and_load_round_trip_preserves_search() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = VectorIndex::new("test-model");
        index
            .push(make_chunk("docker experience", "jobs.txt", 0), vec![1.0, 0.2])
            .unwrap();
        index
            .push(make_chunk("florist", "other.txt", 0), vec![0.0, 1.0])
            .unwrap();
        index.persist(dir.path()).unwrap();

        let reloaded = VectorIndex::load(dir.path()).unwrap().unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.embedding_model(), "test-model");

        let before = index.search(&[1.0, 0.0], 2);
        let after = reloaded.search(&[1.0, 0.0], 2);
        assert_eq!(before[0].chunk.text, after[0].chunk.text);
        assert_eq!(before[1].chunk.text, after[1].chunk.text);
    }

    #[test]
    fn test_load_missing_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(VectorIndex::load(&dir.path().join("nothing-here"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_load_corrupt_entries_is_index_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = VectorIndex::new("test-model");
        index
            .push(make_chunk("a", "a.txt", 0), vec![1.0])
            .unwrap();
        index.persist(dir.path()).unwrap();
        std::fs::write(dir.path().join(ENTRIES_FILE), b"not bincode").unwrap();

        let err = VectorIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, AppError::Index(_)));
    }

    #[test]
    fn test_persist_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = VectorIndex::new("test-model");
        first
            .push(make_chunk("old", "a.txt", 0), vec![1.0])
            .unwrap();
        first
            .push(make_chunk("old2", "a.txt", 1), vec![0.5])
            .unwrap();
        first.persist(dir.path()).unwrap();

        let mut second = VectorIndex::new("test-model");
        second
            .push(make_chunk("new", "b.txt", 0), vec![1.0])
            .unwrap();
        second.persist(dir.path()).unwrap();

        let reloaded = VectorIndex::load(dir.path()).unwrap().unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.search(&[1.0], 5)[0].chunk.text, "new");
    }
}
