use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryLogError {
    /// Unrecognized source capture mode
    #[error("Invalid source capture mode: {0}")]
    InvalidSourceCapture(String),

    /// Malformed configuration value
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Error rendering the collected log (e.g. JSON serialization failure)
    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for QueryLogError {
    fn from(err: serde_json::Error) -> Self {
        QueryLogError::Serialization(err.to_string())
    }
}

/// Result type for query log operations
pub type Result<T> = std::result::Result<T, QueryLogError>;
