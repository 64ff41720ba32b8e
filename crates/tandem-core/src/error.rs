use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Search index holds no documents")]
    EmptyCorpus,

    #[error("Index unavailable at {path}: {reason}")]
    IndexUnavailable { path: String, reason: String },

    #[error("Reranker model unavailable: {0}")]
    RerankerUnavailable(String),

    #[error("Reranker scoring failed: {0}")]
    RerankerScoringFailure(String),

    #[error("Malformed fallback ranking response: {0}")]
    MalformedFallbackResponse(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
