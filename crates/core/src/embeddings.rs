use crate::models::{EmbeddingBatch, EmbeddingFailure};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

const DEFAULT: usize = 384;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedder configured with zero dimensions")]
    ZeroDimensions,

    #[error("model error: {0}")]
    Model(String),
}

/// Maps text to a fixed-dimension dense vector. Implementations must be
/// deterministic for a fixed configuration and safe to share by reference
/// across concurrent callers.
pub trait Embedder {
    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Local sentence embedder: character-trigram feature hashing with FNV-1a,
/// L2-normalized. Stateless, so there is no lazy model load to guard;
/// construct it once at startup and share it.
///
/// An empty string hashes no trigrams and yields the zero vector, which is
/// a valid embedding rather than a special case.
#[derive(Debug, Clone, Copy)]
pub struct HashingSentenceEmbedder {
    pub dimensions: usize,
}

impl Default for HashingSentenceEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl Embedder for HashingSentenceEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if self.dimensions == 0 {
            return Err(EmbedError::ZeroDimensions);
        }

        let mut vector = vec![0f32; self.dimensions];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return Ok(vector);
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        Ok(vector)
    }
}

/// Embeds every document in `texts`, recording per-document failures
/// instead of failing the batch. The returned map can be smaller than the
/// input; callers must tolerate that.
pub fn embed_batch<E: Embedder>(
    embedder: &E,
    texts: &BTreeMap<String, String>,
) -> EmbeddingBatch {
    let mut batch = EmbeddingBatch::default();

    for (document_id, text) in texts {
        match embedder.embed(text) {
            Ok(vector) => {
                batch.vectors.insert(document_id.clone(), vector);
            }
            Err(error) => {
                warn!(document_id = %document_id, error = %error, "dropping document from batch");
                batch.failures.push(EmbeddingFailure {
                    document_id: document_id.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    batch
}
