//! Image catalog abstraction.
//!
//! The fetcher talks to the catalog only through [`ImageCatalog`], so the
//! Earth Engine client is constructed once in `main` and passed in, and tests
//! substitute an in-memory catalog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use goes_common::{ExportGrid, MinuteWindow};

use crate::error::{FetchError, FetchResult};

/// One catalog scene and its metadata properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Asset id, e.g. `NOAA/GOES/16/MCMIPF/2022182153020700000`.
    pub id: String,
    pub acquired: DateTime<Utc>,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

impl Scene {
    pub fn property_f64(&self, name: &str) -> FetchResult<f64> {
        self.properties
            .get(name)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| FetchError::MissingProperty {
                scene: self.id.clone(),
                property: name.to_string(),
            })
    }

    /// `(scale, offset)` of a band from its `{band}_scale` / `{band}_offset` properties.
    pub fn band_scaling(&self, band: &str) -> FetchResult<BandScaling> {
        Ok(BandScaling {
            band: band.to_string(),
            scale: self.property_f64(&format!("{}_scale", band))?,
            offset: self.property_f64(&format!("{}_offset", band))?,
        })
    }
}

/// Linear calibration applied to one band: `value * scale + offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandScaling {
    pub band: String,
    pub scale: f64,
    pub offset: f64,
}

/// Everything needed to request a single-file export of one scene.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub scene_id: String,
    pub bands: Vec<BandScaling>,
    /// Target CRS, e.g. "EPSG:32618".
    pub crs: String,
    pub grid: ExportGrid,
    pub file_format: String,
}

impl ExportRequest {
    pub fn band_names(&self) -> Vec<String> {
        self.bands.iter().map(|b| b.band.clone()).collect()
    }
}

/// Satellite image collection query interface.
#[async_trait]
pub trait ImageCatalog: Send + Sync {
    /// Scenes of `collection` acquired within `window`.
    async fn find_scenes(&self, collection: &str, window: MinuteWindow) -> FetchResult<Vec<Scene>>;

    /// A URL from which the requested export can be downloaded.
    async fn export_url(&self, request: &ExportRequest) -> FetchResult<String>;
}
