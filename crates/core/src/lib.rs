pub mod chat;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod stores;
pub mod upload;

pub use chat::CompletionClient;
pub use embeddings::{
    embed_batch, EmbedError, Embedder, HashingSentenceEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{IngestError, PipelineError};
pub use extractor::{extract_page_texts, PageText, PdfExtractor, RemoteOcrClient};
pub use index::{search_similar, FlatIndex};
pub use models::{
    DocumentRecord, EmbeddingBatch, EmbeddingFailure, Neighbor, PipelineOptions, SimilarityReport,
};
pub use pipeline::RecommendationPipeline;
pub use store::DocumentStore;
pub use stores::CosmosStore;
pub use upload::{
    discover_pdf_files, process_pdf, upload_folder_best_effort, SkippedPdf, UploadReport,
};
