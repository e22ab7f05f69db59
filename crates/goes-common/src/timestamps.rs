//! Acquisition timestamp index read from the reference CSV.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{GeoError, GeoResult};
use crate::time::{from_epoch_millis, goes_time_str};

/// Ordered acquisition timestamps.
#[derive(Debug, Clone, Default)]
pub struct TimestampIndex {
    timestamps: Vec<DateTime<Utc>>,
}

impl TimestampIndex {
    pub fn new(timestamps: Vec<DateTime<Utc>>) -> Self {
        Self { timestamps }
    }

    /// Read every row of `path`, taking epoch milliseconds from `column`.
    pub fn load(path: impl AsRef<Path>, column: &str) -> GeoResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| GeoError::io(path, e))?;
        let index = Self::from_reader(file, column)?;
        info!(path = %path.display(), count = index.len(), "Loaded timestamp index");
        Ok(index)
    }

    pub fn from_reader<R: std::io::Read>(reader: R, column: &str) -> GeoResult<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let col = rdr
            .headers()?
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| {
                GeoError::InvalidConfig(format!("timestamp column '{}' not in header", column))
            })?;

        let mut timestamps = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let raw = record.get(col).unwrap_or("").trim();
            // Pandas writes integer columns with NaNs as floats.
            let ms = raw
                .parse::<i64>()
                .or_else(|_| raw.parse::<f64>().map(|v| v as i64))
                .map_err(|_| GeoError::InvalidTimestamp(raw.to_string()))?;
            timestamps.push(from_epoch_millis(ms)?);
        }
        debug!(rows = timestamps.len(), "Parsed timestamp rows");
        Ok(Self { timestamps })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Up to `count` timestamps starting at `start`, clamped to the index.
    pub fn slice(&self, start: usize, count: usize) -> &[DateTime<Utc>] {
        let start = start.min(self.timestamps.len());
        let end = start.saturating_add(count).min(self.timestamps.len());
        &self.timestamps[start..end]
    }

    pub fn iter(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.timestamps.iter()
    }

    /// Map from minute stamp (`YYYYMMDDHHMM`) to the exact timestamp.
    pub fn by_minute(&self) -> HashMap<String, DateTime<Utc>> {
        self.timestamps
            .iter()
            .map(|t| (goes_time_str(*t), *t))
            .collect()
    }
}
