//! Error types for dataset configuration and lookups.

use thiserror::Error;

/// Result type alias using GeoError.
pub type GeoResult<T> = Result<T, GeoError>;

/// Errors raised while loading configuration or resolving dataset inputs.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Unknown city: {0}")]
    UnknownCity(String),

    #[error("Invalid UTM zone {0}: expected 1..=60")]
    InvalidZone(u8),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Environment variable {0} not set")]
    MissingEnvVar(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to read timestamp table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

impl GeoError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        GeoError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
