//! Custom error types for rsiapi.
//!
//! Every fallible operation returns `Result<T, RsiError>`. The three API-level
//! failures (bad HTTP status, failed envelope, unusable payload) each have their
//! own variant so callers can match on them.

use std::fmt;

use thiserror::Error;

/// Main error type for rsiapi operations.
#[derive(Debug, Error)]
pub enum RsiError {
    /// Server answered with a status other than 200
    #[error("Request returned {status}: {reason}")]
    BadResponse {
        /// HTTP status code
        status: u16,
        /// Reason phrase for the status
        reason: String,
    },

    /// Envelope came back without a truthy `success` flag
    #[error("{endpoint} request failed: {message}")]
    RequestFailed {
        /// Endpoint path the request was sent to
        endpoint: String,
        /// The API's `msg` field
        message: String,
    },

    /// Payload parsed but is not what the caller needs
    #[error("Bad response data: {0}")]
    BadResponseData(String),

    /// Network/HTTP transport error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSS selector failed to compile
    #[error("Selector error: {0}")]
    Selector(String),

    /// Regex pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

impl RsiError {
    /// Create a bad response data error.
    pub fn bad_data(message: impl Into<String>) -> Self {
        Self::BadResponseData(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl fmt::Display) -> Self {
        Self::Config(message.to_string())
    }

    /// HTTP status carried by a `BadResponse`, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias using `RsiError`
pub type Result<T> = std::result::Result<T, RsiError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a bad response data message
    fn ok_or_bad_data(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_bad_data(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| RsiError::bad_data(msg))
    }
}
