//! Error types for the Reprise engine

use thiserror::Error;

/// Result type alias for Reprise operations
pub type RepriseResult<T> = Result<T, RepriseError>;

/// Main error type for the Reprise engine
#[derive(Error, Debug, Clone)]
pub enum RepriseError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Captured transcript parsing/validation errors
    #[error("Transcript error: {0}")]
    Transcript(String),

    /// Model backend errors
    #[error("Backend error: {0}")]
    Backend(String),

    /// Judge backend errors
    #[error("Judge error: {0}")]
    Judge(String),

    /// Persistence boundary errors
    #[error("Store error: {0}")]
    Store(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend call timeout
    #[error("Backend call timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Run was cancelled
    #[error("Run was cancelled")]
    Cancelled,

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl RepriseError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new transcript error
    pub fn transcript(message: impl Into<String>) -> Self {
        Self::Transcript(message.into())
    }

    /// Create a new backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Create a new judge error
    pub fn judge(message: impl Into<String>) -> Self {
        Self::Judge(message.into())
    }

    /// Create a new store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a new timeout error
    pub const fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }
}

impl From<anyhow::Error> for RepriseError {
    fn from(error: anyhow::Error) -> Self {
        Self::Other(error.to_string())
    }
}

impl From<std::io::Error> for RepriseError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for RepriseError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

impl From<reqwest::Error> for RepriseError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(error.to_string())
    }
}
