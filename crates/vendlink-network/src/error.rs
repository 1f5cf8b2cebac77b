//! Error types for card validation.

use thiserror::Error;

/// Result type alias for validation operations.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Errors that can occur while checking a card balance.
///
/// A low balance is not an error: it comes back as an unauthorized
/// [`ValidationResult`](vendlink_core::ValidationResult).
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The request did not complete within the configured timeout
    #[error("Validation timeout after {0}ms")]
    Timeout(u64),

    /// The service could not be reached
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The service answered with a status other than 200 or 201
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// The response body did not carry a usable balance
    #[error("Invalid balance response: {0}")]
    Decode(String),

    /// Any other transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The client configuration cannot be used
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ValidationError {
    /// Whether the failure was the request timing out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
