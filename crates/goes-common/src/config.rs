//! Dataset configuration loaded from `config/dataset.yaml`.
//!
//! Values may reference environment variables with `$VAR`, `${VAR}` or
//! `${VAR:-default}`; expansion happens on the raw text before parsing.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::city::Coverage;
use crate::error::{GeoError, GeoResult};

/// Complete dataset configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatasetConfig {
    #[serde(default)]
    pub satellites: SatelliteConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub microwave: MicrowaveConfig,
    #[serde(default)]
    pub earth_engine: EarthEngineConfig,
}

/// Collection ids per coverage and the West-coverage satellite cutover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteConfig {
    pub east_collection: String,
    pub west_collection_before: String,
    pub west_collection_after: String,
    /// First instant served by `west_collection_after`.
    pub west_cutover: DateTime<Utc>,
}

impl Default for SatelliteConfig {
    fn default() -> Self {
        Self {
            east_collection: "NOAA/GOES/16/MCMIPF".to_string(),
            west_collection_before: "NOAA/GOES/17/MCMIPF".to_string(),
            west_collection_after: "NOAA/GOES/18/MCMIPF".to_string(),
            west_cutover: Utc.with_ymd_and_hms(2023, 1, 4, 0, 0, 0).single().unwrap_or_default(),
        }
    }
}

impl SatelliteConfig {
    /// Collection that covers `coverage` at instant `t`.
    pub fn collection_for(&self, coverage: Coverage, t: DateTime<Utc>) -> &str {
        match coverage {
            Coverage::East => &self.east_collection,
            Coverage::West if t < self.west_cutover => &self.west_collection_before,
            Coverage::West => &self.west_collection_after,
        }
    }
}

/// Export request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub bands: Vec<String>,
    /// Output ground sampling distance in metres.
    pub scale: f64,
    /// Pixel size of the reference scene whose centre anchors the region.
    pub source_pixel_size: f64,
    pub source_pixel_count: u32,
    /// Buffer around the region centre in metres.
    pub buffer: f64,
    pub file_format: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            bands: ["CMI_C13", "CMI_C14", "CMI_C15", "CMI_C16"]
                .iter()
                .map(|b| b.to_string())
                .collect(),
            scale: 2000.0,
            source_pixel_size: 30.0,
            source_pixel_count: 2999,
            buffer: 44_000.0,
            file_format: "GEO_TIFF".to_string(),
        }
    }
}

/// Retry policy for catalog queries and downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 1000,
            backoff_factor: 2,
        }
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Reference CSVs of acquisition timestamps, one per coverage.
    pub east_times_csv: PathBuf,
    pub west_times_csv: PathBuf,
    pub timestamp_column: String,
    /// Downloads land in `{raster_root}/{city}`.
    pub raster_root: PathBuf,
    pub microwave_dir: PathBuf,
    /// Aligned outputs land in `{processed_root}/{city}`.
    pub processed_root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            east_times_csv: PathBuf::from("data/GOES_East_times.csv"),
            west_times_csv: PathBuf::from("data/GOES_West_times.csv"),
            timestamp_column: "value".to_string(),
            raster_root: PathBuf::from("data/GOES_files"),
            microwave_dir: PathBuf::from("data/MW_LST_DTC"),
            processed_root: PathBuf::from("data/processed"),
        }
    }
}

impl PathsConfig {
    pub fn times_csv(&self, coverage: Coverage) -> &Path {
        match coverage {
            Coverage::East => &self.east_times_csv,
            Coverage::West => &self.west_times_csv,
        }
    }

    pub fn raster_dir(&self, city: &str) -> PathBuf {
        self.raster_root.join(city)
    }

    pub fn processed_dir(&self, city: &str) -> PathBuf {
        self.processed_root.join(city)
    }
}

/// Microwave grid file layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicrowaveConfig {
    /// File name pattern; `{date}` is replaced by `YYYYMMDD`.
    pub file_pattern: String,
    pub variable: String,
    /// Stored values are Kelvin multiplied by this factor.
    pub scale_divisor: f64,
    /// Dates with no grid file; aligned output is filled with NaN.
    pub missing_dates: Vec<NaiveDate>,
}

impl Default for MicrowaveConfig {
    fn default() -> Self {
        Self {
            file_pattern: "MW_LST_DTC_{date}_x1y.h5".to_string(),
            variable: "TB37V_LST_DTC".to_string(),
            scale_divisor: 50.0,
            missing_dates: [(2021, 12, 31), (2022, 3, 22)]
                .iter()
                .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
                .collect(),
        }
    }
}

impl MicrowaveConfig {
    pub fn file_name(&self, date: NaiveDate) -> String {
        self.file_pattern
            .replace("{date}", &date.format("%Y%m%d").to_string())
    }

    pub fn is_missing(&self, date: NaiveDate) -> bool {
        self.missing_dates.contains(&date)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarthEngineConfig {
    pub endpoint: String,
    pub project: String,
    /// OAuth2 bearer token; empty means "read EE_ACCESS_TOKEN at runtime".
    #[serde(default)]
    pub access_token: String,
    pub request_timeout_secs: u64,
}

impl Default for EarthEngineConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://earthengine.googleapis.com".to_string(),
            project: "earthengine-legacy".to_string(),
            access_token: String::new(),
            request_timeout_secs: 120,
        }
    }
}

impl DatasetConfig {
    /// Load and validate configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> GeoResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| GeoError::io(path, e))?;
        let config = Self::from_yaml(&content)?;
        debug!(path = %path.display(), "Loaded dataset configuration");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> GeoResult<Self> {
        let expanded = expand_env_vars(content)?;
        let config: DatasetConfig = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> GeoResult<()> {
        if self.export.bands.is_empty() {
            return Err(GeoError::InvalidConfig("export.bands cannot be empty".into()));
        }
        if self.export.scale <= 0.0 {
            return Err(GeoError::InvalidConfig("export.scale must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(GeoError::InvalidConfig(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if !self.microwave.file_pattern.contains("{date}") {
            return Err(GeoError::InvalidConfig(
                "microwave.file_pattern must contain {date}".into(),
            ));
        }
        if self.microwave.scale_divisor == 0.0 {
            return Err(GeoError::InvalidConfig(
                "microwave.scale_divisor cannot be zero".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Environment variable expansion
// ============================================================================

/// Expand `$VAR`, `${VAR}` and `${VAR:-default}` references in `content`.
pub fn expand_env_vars(content: &str) -> GeoResult<String> {
    shellexpand::env(content)
        .map(|expanded| expanded.into_owned())
        .map_err(|e| GeoError::MissingEnvVar(e.var_name))
}
