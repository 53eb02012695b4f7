//! Error types for sqlscript

use thiserror::Error;

/// Result type alias for statement and script operations
pub type BuildResult<T> = Result<T, BuildError>;

/// Error types for statement assembly and script rendering
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid operation/join kind, missing column metadata, malformed template
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A parameter reference could not be bound to a value
    #[error("Binding error: {0}")]
    Binding(String),

    /// A record field could not be converted into a parameter value
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Mapper configuration could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),
}

impl BuildError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a binding error
    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding(message.into())
    }

    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is a binding error
    pub fn is_binding(&self) -> bool {
        matches!(self, Self::Binding(_))
    }
}

impl From<serde_json::Error> for BuildError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BuildError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for BuildError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}
