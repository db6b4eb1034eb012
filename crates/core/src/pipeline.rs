use crate::embeddings::{embed_batch, Embedder};
use crate::error::PipelineError;
use crate::index::FlatIndex;
use crate::models::{PipelineOptions, SimilarityReport};
use crate::store::DocumentStore;
use tracing::{debug, info};

/// Sequences the document store, the embedder, and the flat index into one
/// request-scoped similarity run. Nothing is cached between runs; every
/// call re-embeds and rebuilds the index over the owner's current
/// documents.
pub struct RecommendationPipeline<S, E>
where
    S: DocumentStore,
    E: Embedder,
{
    store: S,
    embedder: E,
    options: PipelineOptions,
}

impl<S, E> RecommendationPipeline<S, E>
where
    S: DocumentStore + Send + Sync,
    E: Embedder + Send + Sync,
{
    pub fn new(store: S, embedder: E, options: PipelineOptions) -> Self {
        Self {
            store,
            embedder,
            options,
        }
    }

    /// Nearest neighbors among one owner's documents.
    ///
    /// An owner with no documents is a `NoDocuments` condition, not an
    /// empty mapping; documents that fail to embed are dropped and carried
    /// in the report's `failures`, and only when every document fails does
    /// the run abort with `EmbeddingUnavailable`.
    pub async fn recommend(&self, owner: &str) -> Result<SimilarityReport, PipelineError> {
        let texts = self.store.fetch_texts(owner).await?;

        if texts.is_empty() {
            return Err(PipelineError::NoDocuments);
        }

        debug!(owner = %owner, documents = texts.len(), "embedding owner documents");
        let batch = embed_batch(&self.embedder, &texts);

        if batch.is_empty() {
            return Err(PipelineError::EmbeddingUnavailable {
                failed: batch.failures.len(),
            });
        }

        let index = FlatIndex::build(&batch.vectors)?;
        let neighbors = index.neighbors_all(self.options.top_k, self.options.include_self);

        info!(
            owner = %owner,
            indexed = index.len(),
            dropped = batch.failures.len(),
            top_k = self.options.top_k,
            "similarity search complete"
        );

        Ok(SimilarityReport {
            neighbors,
            failures: batch.failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbedError, HashingSentenceEmbedder};
    use crate::error::PipelineError;
    use crate::models::DocumentRecord;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct FakeStore {
        texts: BTreeMap<String, String>,
    }

    #[async_trait]
    impl DocumentStore for FakeStore {
        async fn fetch_texts(
            &self,
            _owner: &str,
        ) -> Result<BTreeMap<String, String>, PipelineError> {
            Ok(self.texts.clone())
        }

        async fn list_documents(
            &self,
            _owner: &str,
        ) -> Result<Vec<DocumentRecord>, PipelineError> {
            Ok(Vec::new())
        }

        async fn put_document(&self, _record: &DocumentRecord) -> Result<(), PipelineError> {
            Ok(())
        }
    }

    struct AlwaysFailingEmbedder;

    impl Embedder for AlwaysFailingEmbedder {
        fn dimensions(&self) -> usize {
            8
        }

        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            Err(EmbedError::Model("model offline".to_string()))
        }
    }

    struct FlakyEmbedder;

    impl Embedder for FlakyEmbedder {
        fn dimensions(&self) -> usize {
            8
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            if text.contains("corrupt") {
                Err(EmbedError::Model("undecodable text".to_string()))
            } else {
                HashingSentenceEmbedder { dimensions: 8 }.embed(text)
            }
        }
    }

    fn sample_texts() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("a".to_string(), "cat sat on mat".to_string()),
            ("b".to_string(), "dog sat on rug".to_string()),
            ("c".to_string(), "quantum entanglement theory".to_string()),
        ])
    }

    #[tokio::test]
    async fn empty_owner_is_a_no_documents_condition() {
        let pipeline = RecommendationPipeline::new(
            FakeStore::default(),
            HashingSentenceEmbedder::default(),
            PipelineOptions::default(),
        );

        let result = pipeline.recommend("alice").await;
        assert!(matches!(result, Err(PipelineError::NoDocuments)));
    }

    #[tokio::test]
    async fn all_embeddings_failing_aborts_the_run() {
        let store = FakeStore {
            texts: sample_texts(),
        };
        let pipeline =
            RecommendationPipeline::new(store, AlwaysFailingEmbedder, PipelineOptions::default());

        let result = pipeline.recommend("alice").await;
        assert!(matches!(
            result,
            Err(PipelineError::EmbeddingUnavailable { failed: 3 })
        ));
    }

    #[tokio::test]
    async fn partial_failures_are_dropped_and_reported() {
        let mut texts = sample_texts();
        texts.insert("d".to_string(), "corrupt scan".to_string());
        let store = FakeStore { texts };
        let pipeline =
            RecommendationPipeline::new(store, FlakyEmbedder, PipelineOptions::default());

        let report = pipeline.recommend("alice").await.expect("recommend");

        assert_eq!(report.neighbors.len(), 3);
        assert!(!report.neighbors.contains_key("d"));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].document_id, "d");
    }

    #[tokio::test]
    async fn neighbor_count_is_capped_by_document_count() {
        let store = FakeStore {
            texts: sample_texts(),
        };
        let options = PipelineOptions {
            top_k: 10,
            include_self: true,
        };
        let pipeline =
            RecommendationPipeline::new(store, HashingSentenceEmbedder::default(), options);

        let report = pipeline.recommend("alice").await.expect("recommend");

        for neighbors in report.neighbors.values() {
            assert_eq!(neighbors.len(), 3);
        }
    }

    #[tokio::test]
    async fn self_matches_can_be_filtered() {
        let store = FakeStore {
            texts: sample_texts(),
        };
        let options = PipelineOptions {
            top_k: 2,
            include_self: false,
        };
        let pipeline =
            RecommendationPipeline::new(store, HashingSentenceEmbedder::default(), options);

        let report = pipeline.recommend("alice").await.expect("recommend");

        for (document_id, neighbors) in &report.neighbors {
            assert!(neighbors
                .iter()
                .all(|neighbor| &neighbor.document_id != document_id));
        }
    }
}
