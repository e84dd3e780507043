//! Error types for Dialwave

use thiserror::Error;

use crate::outbound::ValidationErrors;

/// Result type alias for Dialwave operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Dialwave
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credentials, bad environment values)
    #[error("configuration error: {0}")]
    Config(String),

    /// Request failed schema validation
    #[error("invalid payload: {0}")]
    Validation(ValidationErrors),

    /// Destination number could not be normalized
    #[error("invalid customer number")]
    InvalidNumber,

    /// Voice platform rejected or failed a request
    #[error("provider error: {0}")]
    Provider(String),

    /// Live voice session error
    #[error("session error: {0}")]
    Session(String),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}
