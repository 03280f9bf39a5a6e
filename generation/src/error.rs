//! Error types for answer generation.

use thiserror::Error;

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors that can occur while generating an answer.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// No usable language model (missing API key or client setup failure).
    #[error("language model not configured: {0}")]
    NotConfigured(String),

    /// The model API rejected or failed the request.
    #[error("API request failed: {0}")]
    Api(String),

    /// The model API answered with something we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
