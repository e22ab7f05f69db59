//! Daily microwave LST grids.
//!
//! Each file holds one calendar day of a global 0.25 degree grid sampled every
//! 15 minutes. The HDF5 files carry no coordinate variables and use phony
//! dimension names, so axes are identified by length.

use chrono::NaiveDate;
use std::ops::Range;
use std::path::PathBuf;
use tracing::{debug, instrument};

use goes_common::config::MicrowaveConfig;

use crate::error::{RasterIoError, RasterIoResult};
use crate::native::{get_f64_attr, read_f32, silence_hdf5_errors, Hyperslab};

pub const SLOTS_PER_DAY: usize = 96;
pub const LON_COUNT: usize = 1440;
pub const LAT_COUNT: usize = 600;
pub const RESOLUTION_DEG: f64 = 0.25;
/// Longitude of column 0 (ascending).
pub const LON_FIRST: f64 = -180.0;
/// Latitude of row 0 (descending).
pub const LAT_FIRST: f64 = 89.75;

/// Rectangular window of the global grid, half-open in both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridWindow {
    pub lon: (usize, usize),
    pub lat: (usize, usize),
}

impl GridWindow {
    /// Smallest window whose lattice points enclose the given extent.
    ///
    /// Bounds are rounded outward to the 0.25 degree lattice.
    pub fn covering(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Self {
        let lon_index = |lon: f64| (lon - LON_FIRST) / RESOLUTION_DEG;
        let lat_index = |lat: f64| (LAT_FIRST - lat) / RESOLUTION_DEG;

        let lon_start = lon_index(min_lon).floor().max(0.0) as usize;
        let lon_end = (lon_index(max_lon).ceil().max(0.0) as usize + 1).min(LON_COUNT);
        let lat_start = lat_index(max_lat).floor().max(0.0) as usize;
        let lat_end = (lat_index(min_lat).ceil().max(0.0) as usize + 1).min(LAT_COUNT);

        Self {
            lon: (lon_start.min(lon_end), lon_end),
            lat: (lat_start.min(lat_end), lat_end),
        }
    }

    pub fn width(&self) -> usize {
        self.lon.1 - self.lon.0
    }

    pub fn height(&self) -> usize {
        self.lat.1 - self.lat.0
    }

    /// Longitude of the window's first column.
    pub fn lon_origin(&self) -> f64 {
        LON_FIRST + self.lon.0 as f64 * RESOLUTION_DEG
    }

    /// Latitude of the window's first row.
    pub fn lat_origin(&self) -> f64 {
        LAT_FIRST - self.lat.0 as f64 * RESOLUTION_DEG
    }

    /// Fractional (column, row) of a geographic point within the window.
    pub fn fractional_index(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            (lon - self.lon_origin()) / RESOLUTION_DEG,
            (self.lat_origin() - lat) / RESOLUTION_DEG,
        )
    }
}

/// Cropped slots of one day, in Kelvin.
///
/// `values` is slot-major: `[slot][lat row][lon column]`.
#[derive(Debug, Clone)]
pub struct MicrowaveDay {
    pub date: NaiveDate,
    pub slots: Range<usize>,
    pub window: GridWindow,
    pub values: Vec<f32>,
}

impl MicrowaveDay {
    /// Field of one absolute slot of the day, if it was loaded.
    pub fn slot(&self, slot: usize) -> Option<&[f32]> {
        if !self.slots.contains(&slot) {
            return None;
        }
        let plane = self.window.width() * self.window.height();
        let offset = (slot - self.slots.start) * plane;
        self.values.get(offset..offset + plane)
    }
}

/// Provider of daily microwave grids.
pub trait MicrowaveSource: Send + Sync {
    /// Load `slots` of `date` cropped to `window`.
    fn load_day(
        &self,
        date: NaiveDate,
        slots: Range<usize>,
        window: &GridWindow,
    ) -> RasterIoResult<MicrowaveDay>;
}

/// Reads `MW_LST_DTC_{YYYYMMDD}_x1y.h5` files from a directory.
#[derive(Debug, Clone)]
pub struct NetcdfMicrowaveSource {
    dir: PathBuf,
    config: MicrowaveConfig,
}

impl NetcdfMicrowaveSource {
    pub fn new(dir: impl Into<PathBuf>, config: MicrowaveConfig) -> Self {
        silence_hdf5_errors();
        Self {
            dir: dir.into(),
            config,
        }
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(self.config.file_name(date))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Slot,
    Lon,
    Lat,
}

fn axis_for_len(len: usize) -> Option<Axis> {
    match len {
        SLOTS_PER_DAY => Some(Axis::Slot),
        LON_COUNT => Some(Axis::Lon),
        LAT_COUNT => Some(Axis::Lat),
        _ => None,
    }
}

impl MicrowaveSource for NetcdfMicrowaveSource {
    #[instrument(skip(self, window))]
    fn load_day(
        &self,
        date: NaiveDate,
        slots: Range<usize>,
        window: &GridWindow,
    ) -> RasterIoResult<MicrowaveDay> {
        let path = self.path_for(date);
        if !path.exists() {
            return Err(RasterIoError::MissingGrid { date, path });
        }
        if slots.start >= slots.end || slots.end > SLOTS_PER_DAY {
            return Err(RasterIoError::InvalidFormat(format!(
                "slot range {:?} outside 0..{}",
                slots, SLOTS_PER_DAY
            )));
        }

        let file = netcdf::open(&path)?;
        let var = file.variable(&self.config.variable).ok_or_else(|| {
            RasterIoError::MissingData(format!("{} in {}", self.config.variable, path.display()))
        })?;

        let axes: Vec<Axis> = var
            .dimensions()
            .iter()
            .map(|d| {
                axis_for_len(d.len()).ok_or_else(|| {
                    RasterIoError::InvalidFormat(format!(
                        "unexpected dimension {} of length {}",
                        d.name(),
                        d.len()
                    ))
                })
            })
            .collect::<RasterIoResult<_>>()?;
        if axes.len() != 3
            || !(axes.contains(&Axis::Slot) && axes.contains(&Axis::Lon) && axes.contains(&Axis::Lat))
        {
            return Err(RasterIoError::InvalidFormat(format!(
                "{} must have slot, longitude and latitude axes, found {:?}",
                self.config.variable, axes
            )));
        }

        let range_for = |axis: Axis| match axis {
            Axis::Slot => slots.clone(),
            Axis::Lon => window.lon.0..window.lon.1,
            Axis::Lat => window.lat.0..window.lat.1,
        };
        let slab: Hyperslab = (range_for(axes[0]), range_for(axes[1]), range_for(axes[2]));
        let lens = [slab.0.len(), slab.1.len(), slab.2.len()];
        let raw = read_f32(&var, slab)?;
        if raw.len() != lens.iter().product::<usize>() {
            return Err(RasterIoError::ShapeMismatch {
                name: self.config.variable.clone(),
                expected: lens.iter().product(),
                actual: raw.len(),
            });
        }

        let fill = get_f64_attr(&var, "_FillValue").map(|v| v as f32);
        let divisor = self.config.scale_divisor as f32;

        // Reorder from file axis order to [slot][lat][lon].
        let (n_slots, n_lat, n_lon) = (slots.len(), window.height(), window.width());
        let mut values = vec![f32::NAN; n_slots * n_lat * n_lon];
        for i0 in 0..lens[0] {
            for i1 in 0..lens[1] {
                for i2 in 0..lens[2] {
                    let raw_value = raw[(i0 * lens[1] + i1) * lens[2] + i2];
                    let mut idx = [0usize; 3];
                    for (axis, i) in axes.iter().zip([i0, i1, i2]) {
                        match axis {
                            Axis::Slot => idx[0] = i,
                            Axis::Lat => idx[1] = i,
                            Axis::Lon => idx[2] = i,
                        }
                    }
                    values[(idx[0] * n_lat + idx[1]) * n_lon + idx[2]] = match fill {
                        Some(f) if raw_value == f => f32::NAN,
                        _ => raw_value / divisor,
                    };
                }
            }
        }

        debug!(path = %path.display(), n_slots, n_lat, n_lon, "Loaded microwave window");

        Ok(MicrowaveDay {
            date,
            slots,
            window: *window,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covering_rounds_outward() {
        let window = GridWindow::covering(-77.3, -76.1, 38.4, 39.3);
        assert_eq!(window.lon_origin(), -77.5);
        assert_eq!(window.lat_origin(), 89.75 - window.lat.0 as f64 * 0.25);
        assert!(window.lat_origin() >= 39.3);
        // -77.5 .. -76.0 inclusive
        assert_eq!(window.width(), 7);
        // 39.5 .. 38.25 inclusive
        assert_eq!(window.height(), 6);
    }

    #[test]
    fn test_covering_on_lattice() {
        let window = GridWindow::covering(-77.0, -76.5, 38.5, 39.0);
        assert_eq!(window.lon_origin(), -77.0);
        assert_eq!(window.width(), 3);
        assert_eq!(window.lat_origin(), 39.0);
        assert_eq!(window.height(), 3);
    }

    #[test]
    fn test_fractional_index() {
        let window = GridWindow::covering(-77.0, -76.5, 38.5, 39.0);
        assert_eq!(window.fractional_index(-76.75, 38.75), (1.0, 1.0));
    }

    #[test]
    fn test_day_slot_access() {
        let window = GridWindow::covering(0.0, 0.25, 0.0, 0.25);
        let plane = window.width() * window.height();
        let day = MicrowaveDay {
            date: NaiveDate::from_ymd_opt(2022, 7, 1).unwrap(),
            slots: 10..12,
            window,
            values: (0..plane * 2).map(|v| v as f32).collect(),
        };
        assert_eq!(day.slot(11).unwrap()[0], plane as f32);
        assert!(day.slot(9).is_none());
        assert!(day.slot(12).is_none());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = NetcdfMicrowaveSource::new(dir.path(), MicrowaveConfig::default());
        let date = NaiveDate::from_ymd_opt(2022, 7, 1).unwrap();
        let window = GridWindow::covering(-77.0, -76.5, 38.5, 39.0);
        let err = source.load_day(date, 0..4, &window).unwrap_err();
        match err {
            RasterIoError::MissingGrid { date: d, path } => {
                assert_eq!(d, date);
                assert!(path.ends_with("MW_LST_DTC_20220701_x1y.h5"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
