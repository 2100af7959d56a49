//! Common error types for Unistore.

use thiserror::Error;

/// Top-level error type for storage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is invalid or a driver cannot be built from it.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Credentials were rejected by the provider.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Operation is not available for this driver.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Transport-level failure talking to a provider.
    #[error("Network error: {0}")]
    Network(String),

    /// Provider asked us to slow down.
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Provider returned an unexpected status.
    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether retrying the same call may succeed.
    ///
    /// Network blips, throttling and 5xx responses are transient. Everything
    /// that describes the request itself (bad input, missing object, bad
    /// credentials) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) | Error::Throttled(_) => true,
            Error::Provider { status, .. } => *status >= 500,
            Error::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
