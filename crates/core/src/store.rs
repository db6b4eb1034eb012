use crate::error::PipelineError;
use crate::models::DocumentRecord;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Seam between the pipeline and whatever holds the documents. The remote
/// side guarantees no iteration order; adapters sort results into the
/// `BTreeMap` so everything downstream sees a fixed order.
#[async_trait]
pub trait DocumentStore {
    /// All extracted texts for one owner, keyed by document id.
    async fn fetch_texts(&self, owner: &str) -> Result<BTreeMap<String, String>, PipelineError>;

    async fn list_documents(&self, owner: &str) -> Result<Vec<DocumentRecord>, PipelineError>;

    async fn put_document(&self, record: &DocumentRecord) -> Result<(), PipelineError>;
}
