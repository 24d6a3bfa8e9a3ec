//! Session error types.

use thiserror::Error;

/// Session error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request or client construction failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A TLS file was readable but not usable.
    #[error("invalid TLS material in '{path}': {message}")]
    Tls { path: String, message: String },

    /// Failed to read a certificate or key file.
    #[error("failed to read '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// The auth capability could not produce credentials.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Invalid session configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
            || matches!(self, Error::Http(e) if e.status().is_some_and(|s| s.as_u16() == 401))
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;
