use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One stored document as the document store holds it. The pipeline only
/// reads these; ownership of the record stays with the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: String,
    pub owner: String,
    pub filename: String,
    pub text: String,
    pub checksum: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A document that could not be embedded, with the reason it was dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddingFailure {
    pub document_id: String,
    pub reason: String,
}

/// Best-effort result of embedding a batch of documents.
///
/// `vectors` may be smaller than the input map: per-document failures are
/// recorded in `failures` instead of failing the batch.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingBatch {
    pub vectors: BTreeMap<String, Vec<f32>>,
    pub failures: Vec<EmbeddingFailure>,
}

impl EmbeddingBatch {
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// A nearest-neighbor hit: the matched document and its squared Euclidean
/// distance from the query document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Neighbor {
    pub document_id: String,
    pub distance: f32,
}

/// Output of a full pipeline run: per-document neighbor lists in ascending
/// distance order, plus the documents dropped during embedding.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimilarityReport {
    pub neighbors: BTreeMap<String, Vec<Neighbor>>,
    pub failures: Vec<EmbeddingFailure>,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Neighbors requested per document; capped at the document count.
    pub top_k: usize,
    /// Whether a document may appear in its own neighbor list.
    pub include_self: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            include_self: true,
        }
    }
}
