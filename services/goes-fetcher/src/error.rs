//! Error types for scene fetching.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

use goes_common::GeoError;

pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("no scene in {collection} for the minute starting {start}")]
    NoScene {
        collection: String,
        start: DateTime<Utc>,
    },

    #[error("{count} scenes in {collection} for the minute starting {start}")]
    AmbiguousScene {
        collection: String,
        start: DateTime<Utc>,
        count: usize,
    },

    #[error("scene {scene} has no numeric property {property}")]
    MissingProperty { scene: String, property: String },

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no Earth Engine access token: set earth_engine.access_token or EE_ACCESS_TOKEN")]
    MissingCredentials,

    #[error(transparent)]
    Config(#[from] GeoError),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether another attempt may succeed.
    ///
    /// Configuration and credential problems are not retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FetchError::MissingCredentials
                | FetchError::Config(_)
                | FetchError::RetriesExhausted { .. }
        )
    }
}
