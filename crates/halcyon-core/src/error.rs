use thiserror::Error;

/// Top-level error type for the Halcyon system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for HalcyonError` so the `?` operator works across
/// crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalcyonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for HalcyonError {
    fn from(err: toml::de::Error) -> Self {
        HalcyonError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for HalcyonError {
    fn from(err: toml::ser::Error) -> Self {
        HalcyonError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HalcyonError {
    fn from(err: serde_json::Error) -> Self {
        HalcyonError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HalcyonError>;
