//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during profile resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A session was requested but no auth capability is bound.
    #[error("problem with auth parameters for cloud '{cloud}'")]
    MissingAuth { cloud: String },

    /// Session construction or lookup failed.
    #[error(transparent)]
    Session(#[from] stratus_session::Error),

    /// A config value has the wrong shape.
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse YAML.
    #[error("failed to parse YAML config: {0}")]
    ParseYaml(String),
}

impl ConfigError {
    /// Check if this error comes from missing or unusable auth settings.
    pub fn is_auth_error(&self) -> bool {
        match self {
            ConfigError::MissingAuth { .. } => true,
            ConfigError::Session(e) => e.is_auth_error(),
            _ => false,
        }
    }
}
