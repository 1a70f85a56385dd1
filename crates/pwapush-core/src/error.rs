//! Error types for the `pwapush` core library.

use thiserror::Error;

/// Result type alias using the core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `pwapush` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Required configuration (key material) is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A subscription or notification request was rejected before any state
/// was touched.
///
/// `MissingTitle` and `MissingBody` reject a notification message; the rest
/// reject a subscription record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("subscription endpoint is missing or empty")]
    MissingEndpoint,

    #[error("subscription keys are missing or empty")]
    MissingKeys,

    #[error("subscription key `{0}` is missing or empty")]
    MissingKey(&'static str),

    #[error("notification title is missing or empty")]
    MissingTitle,

    #[error("notification body is missing or empty")]
    MissingBody,
}
