//! UTM coordinate reference system codes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GeoError, GeoResult};

/// A WGS84 UTM zone, identified by zone number and hemisphere.
///
/// Maps onto the EPSG codes `326xx` (north) and `327xx` (south).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtmZone {
    pub zone: u8,
    pub northern: bool,
}

impl UtmZone {
    pub fn new(zone: u8, northern: bool) -> GeoResult<Self> {
        if !(1..=60).contains(&zone) {
            return Err(GeoError::InvalidZone(zone));
        }
        Ok(Self { zone, northern })
    }

    /// Three-digit EPSG prefix for the hemisphere.
    pub fn hemisphere_prefix(&self) -> &'static str {
        if self.northern {
            "326"
        } else {
            "327"
        }
    }

    /// Numeric EPSG code, e.g. 32618 for zone 18 north.
    pub fn epsg_code(&self) -> u32 {
        let base = if self.northern { 32600 } else { 32700 };
        base + self.zone as u32
    }

    /// Central meridian of the zone in degrees.
    pub fn central_meridian(&self) -> f64 {
        -183.0 + 6.0 * self.zone as f64
    }
}

impl fmt::Display for UtmZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}{:02}", self.hemisphere_prefix(), self.zone)
    }
}
