use thiserror::Error;

/// Top-level error type for the Nyaya system.
///
/// Each variant wraps a subsystem-specific failure. Subsystem crates define
/// their own error types and implement `From` conversions so that the `?`
/// operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NyayaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for NyayaError {
    fn from(err: toml::de::Error) -> Self {
        NyayaError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for NyayaError {
    fn from(err: toml::ser::Error) -> Self {
        NyayaError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for NyayaError {
    fn from(err: serde_json::Error) -> Self {
        NyayaError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Nyaya operations.
pub type Result<T> = std::result::Result<T, NyayaError>;
