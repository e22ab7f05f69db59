//! Fetch one city/timestamp scene with retry.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use goes_common::config::{ExportConfig, RetryConfig};
use goes_common::{CityExportDescriptor, DatasetConfig, ExportGrid, MinuteWindow, SatelliteConfig};

use crate::catalog::{ExportRequest, ImageCatalog, Scene};
use crate::download::RasterDownloader;
use crate::error::{FetchError, FetchResult};

/// Exponential backoff: waits `initial`, `initial * factor`, ... between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: config.initial_delay(),
            factor: config.backoff_factor.max(1),
        }
    }

    /// Wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.initial_delay
            .saturating_mul(self.factor.saturating_pow(exponent))
    }

    /// Total wait if every attempt fails.
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts).map(|a| self.delay_after(a)).sum()
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> FetchResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = FetchResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(FetchError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    })
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        error = %e,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Fetch attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub path: PathBuf,
    pub scene_id: String,
    pub collection: String,
    pub attempts: u32,
    pub bytes: u64,
}

/// Fetches one calibrated four-band scene for a city.
pub struct ImageFetcher {
    catalog: Arc<dyn ImageCatalog>,
    downloader: Arc<dyn RasterDownloader>,
    satellites: SatelliteConfig,
    export: ExportConfig,
    retry: RetryPolicy,
}

impl ImageFetcher {
    pub fn new(
        catalog: Arc<dyn ImageCatalog>,
        downloader: Arc<dyn RasterDownloader>,
        config: &DatasetConfig,
    ) -> Self {
        Self {
            catalog,
            downloader,
            satellites: config.satellites.clone(),
            export: config.export.clone(),
            retry: RetryPolicy::from_config(&config.retry),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Collection imaging `city` at `timestamp`.
    pub fn collection_for(&self, city: &CityExportDescriptor, timestamp: DateTime<Utc>) -> &str {
        self.satellites.collection_for(city.coverage, timestamp)
    }

    /// Pixel grid every export of `city` is requested on.
    pub fn export_grid(&self, city: &CityExportDescriptor) -> ExportGrid {
        ExportGrid::snap(&city.resolve_region_with(&self.export), self.export.scale)
    }

    /// Export request for `scene`, calibrated from its own scale/offset properties.
    pub fn build_request(
        &self,
        scene: &Scene,
        crs: &str,
        grid: ExportGrid,
    ) -> FetchResult<ExportRequest> {
        let bands = self
            .export
            .bands
            .iter()
            .map(|band| scene.band_scaling(band))
            .collect::<FetchResult<Vec<_>>>()?;
        Ok(ExportRequest {
            scene_id: scene.id.clone(),
            bands,
            crs: crs.to_string(),
            grid,
            file_format: self.export.file_format.clone(),
        })
    }

    async fn attempt(
        &self,
        collection: &str,
        window: MinuteWindow,
        crs: &str,
        grid: ExportGrid,
        output_path: &Path,
    ) -> FetchResult<(String, u64)> {
        let mut scenes = self.catalog.find_scenes(collection, window).await?;
        let scene = match scenes.len() {
            1 => scenes.remove(0),
            0 => {
                return Err(FetchError::NoScene {
                    collection: collection.to_string(),
                    start: window.start,
                })
            }
            count => {
                return Err(FetchError::AmbiguousScene {
                    collection: collection.to_string(),
                    start: window.start,
                    count,
                })
            }
        };

        let request = self.build_request(&scene, crs, grid)?;
        let url = self.catalog.export_url(&request).await?;
        let bytes = self.downloader.download(&url, output_path).await?;
        Ok((scene.id, bytes))
    }

    /// Fetch the scene of `city` acquired in the minute of `timestamp` to `output_path`.
    #[instrument(skip(self, city, output_path), fields(city = %city.name, timestamp = %timestamp))]
    pub async fn fetch(
        &self,
        city: &CityExportDescriptor,
        timestamp: DateTime<Utc>,
        output_path: &Path,
    ) -> FetchResult<FetchOutcome> {
        let crs = city.resolve_crs()?;
        let grid = self.export_grid(city);
        let collection = self.collection_for(city, timestamp).to_string();
        let window = MinuteWindow::containing(timestamp);

        let (attempts, (scene_id, bytes)) = self
            .retry
            .run(|attempt| {
                let (collection, crs) = (collection.as_str(), crs.as_str());
                async move {
                    self.attempt(collection, window, crs, grid, output_path)
                        .await
                        .map(|result| (attempt, result))
                }
            })
            .await?;

        info!(
            path = %output_path.display(),
            scene = %scene_id,
            attempts,
            bytes,
            "Fetched scene"
        );

        Ok(FetchOutcome {
            path: output_path.to_path_buf(),
            scene_id,
            collection,
            attempts,
            bytes,
        })
    }
}
