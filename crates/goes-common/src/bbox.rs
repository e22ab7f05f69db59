//! Bounding box and export grid types.

use serde::{Deserialize, Serialize};

/// A projected bounding box in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Bounds of a point buffered by `radius` in every direction.
    pub fn around_point(x: f64, y: f64, radius: f64) -> Self {
        Self::new(x - radius, y - radius, x + radius, y + radius)
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Pixel grid of an export: a north-up raster aligned to multiples of `scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportGrid {
    /// Left edge of the first column (metres).
    pub origin_x: f64,
    /// Top edge of the first row (metres).
    pub origin_y: f64,
    /// Ground sampling distance (metres per pixel).
    pub scale: f64,
    pub width: usize,
    pub height: usize,
}

impl ExportGrid {
    /// Snap `region` outward to the `scale` lattice.
    pub fn snap(region: &BoundingBox, scale: f64) -> Self {
        let min_x = (region.min_x / scale).floor() * scale;
        let max_x = (region.max_x / scale).ceil() * scale;
        let min_y = (region.min_y / scale).floor() * scale;
        let max_y = (region.max_y / scale).ceil() * scale;

        Self {
            origin_x: min_x,
            origin_y: max_y,
            scale,
            width: ((max_x - min_x) / scale).round() as usize,
            height: ((max_y - min_y) / scale).round() as usize,
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(
            self.origin_x,
            self.origin_y - self.height as f64 * self.scale,
            self.origin_x + self.width as f64 * self.scale,
            self.origin_y,
        )
    }
}
