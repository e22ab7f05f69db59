//! Core types for temporal alignment.

use goes_common::UtmZone;
use projection::TransverseMercator;
use raster_io::RasterRecord;

use crate::error::{AlignError, AlignResult};

/// Geographic position of every pixel centre of a scene grid.
///
/// Row-major with the same orientation as the raster (row 0 at the top).
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonGrid {
    pub width: usize,
    pub height: usize,
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
}

impl LatLonGrid {
    pub fn new(width: usize, height: usize, lon: Vec<f64>, lat: Vec<f64>) -> Self {
        Self {
            width,
            height,
            lon,
            lat,
        }
    }

    /// Inverse-project the projected pixel-centre coordinates of `x` and `y`.
    pub fn from_projected(x: &[f64], y: &[f64], zone: UtmZone) -> Self {
        let (lon, lat) = TransverseMercator::new(zone).inverse_grid(x, y);
        Self::new(x.len(), y.len(), lon, lat)
    }

    /// Pixel grid of `record` in `zone`.
    ///
    /// A raster tagged with another EPSG code is rejected. Untagged rasters
    /// are assumed to be in `zone`.
    pub fn from_record(record: &RasterRecord, zone: UtmZone) -> AlignResult<Self> {
        check_crs(record, zone)?;
        Ok(Self::from_projected(&record.x, &record.y, zone))
    }

    pub fn matches(&self, width: usize, height: usize) -> bool {
        self.width == width
            && self.height == height
            && self.lon.len() == width * height
            && self.lat.len() == width * height
    }

    /// `(min_lon, max_lon, min_lat, max_lat)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let min_max = |values: &[f64]| {
            values
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                })
        };
        let (min_lon, max_lon) = min_max(&self.lon);
        let (min_lat, max_lat) = min_max(&self.lat);
        (min_lon, max_lon, min_lat, max_lat)
    }
}

pub(crate) fn check_crs(record: &RasterRecord, zone: UtmZone) -> AlignResult<()> {
    match record.epsg {
        Some(found) if found != zone.epsg_code() => Err(AlignError::CrsMismatch {
            expected: zone.epsg_code(),
            found,
        }),
        _ => Ok(()),
    }
}
