//! Error types for the Bucketgate service.

use thiserror::Error;

/// Main error type for Bucketgate operations.
///
/// Admission decisions never produce one of these; a denied request is an
/// ordinary [`Decision`](crate::ratelimit::Decision), not a fault.
#[derive(Error, Debug)]
pub enum BucketgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for BucketgateError {
    fn from(err: config::ConfigError) -> Self {
        BucketgateError::Config(err.to_string())
    }
}

/// Result type alias for Bucketgate operations.
pub type Result<T> = std::result::Result<T, BucketgateError>;
