use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote OCR failed: {0}")]
    OcrFailed(String),
}

/// Failures surfaced by the recommendation pipeline and its collaborators.
///
/// `NoDocuments` and `EmbeddingUnavailable` are conditions callers are
/// expected to branch on; the remaining variants are collaborator plumbing.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("user has no stored documents")]
    NoDocuments,

    #[error("embedding failed for all {failed} document(s)")]
    EmbeddingUnavailable { failed: usize },

    #[error("similarity index build failed: {0}")]
    IndexBuildFailed(String),

    #[error("invalid response from {backend}: {details}")]
    Store { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("chat completion failed: {0}")]
    Completion(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
