//! Synthetic microwave grids: on-disk files and an in-memory source.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use goes_common::config::MicrowaveConfig;
use raster_io::microwave::{LAT_COUNT, LON_COUNT, SLOTS_PER_DAY};
use raster_io::{GridWindow, MicrowaveDay, MicrowaveSource, RasterIoError, RasterIoResult};

/// Fill value of synthetic files.
pub const RAW_FILL: i16 = -32768;

/// Builds a full-size daily grid file with only a few slots populated.
///
/// The variable is stored `[slot, lon, lat]` under phony dimension names,
/// chunked so unwritten regions take no space and read back as fill.
pub struct MicrowaveFileBuilder {
    date: NaiveDate,
    planes: Vec<(usize, GridWindow, Vec<i16>)>,
}

impl MicrowaveFileBuilder {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            planes: Vec::new(),
        }
    }

    /// Populate `window` of `slot` with raw counts laid out `[lat][lon]`.
    pub fn with_slot(mut self, slot: usize, window: GridWindow, raw: Vec<i16>) -> Self {
        assert_eq!(raw.len(), window.width() * window.height(), "plane size");
        self.planes.push((slot, window, raw));
        self
    }

    pub fn with_constant_slot(self, slot: usize, window: GridWindow, raw: i16) -> Self {
        let count = window.width() * window.height();
        self.with_slot(slot, window, vec![raw; count])
    }

    /// Write the file into `dir`, named per `config`.
    pub fn write(&self, dir: &Path, config: &MicrowaveConfig) -> PathBuf {
        let path = dir.join(config.file_name(self.date));
        let mut file = netcdf::create(&path).expect("create microwave file");
        file.add_dimension("phony_dim_0", SLOTS_PER_DAY).expect("slot dim");
        file.add_dimension("phony_dim_1", LON_COUNT).expect("lon dim");
        file.add_dimension("phony_dim_2", LAT_COUNT).expect("lat dim");

        let mut var = file
            .add_variable::<i16>(&config.variable, &["phony_dim_0", "phony_dim_1", "phony_dim_2"])
            .expect("add variable");
        var.set_chunking(&[1, 180, 100]).expect("chunking");
        var.set_fill_value(RAW_FILL).expect("fill value");

        for (slot, window, raw) in &self.planes {
            let (width, height) = (window.width(), window.height());
            // [lat][lon] -> [lon][lat]
            let mut transposed = Vec::with_capacity(raw.len());
            for col in 0..width {
                for row in 0..height {
                    transposed.push(raw[row * width + col]);
                }
            }
            var.put_values(
                transposed.as_slice(),
                (
                    *slot..*slot + 1,
                    window.lon.0..window.lon.1,
                    window.lat.0..window.lat.1,
                ),
            )
            .expect("write slot");
        }
        path
    }
}

type FieldFn = Box<dyn Fn(usize, usize, usize) -> f32 + Send + Sync>;

/// In-memory microwave source that counts its loads.
///
/// Each registered day computes Kelvin values from `(slot, global lat row,
/// global lon column)`; unregistered days report a missing grid.
#[derive(Default)]
pub struct FakeMicrowaveSource {
    days: HashMap<NaiveDate, FieldFn>,
    loads: AtomicUsize,
    requests: Mutex<Vec<(NaiveDate, Range<usize>)>>,
}

impl FakeMicrowaveSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_day<F>(mut self, date: NaiveDate, field: F) -> Self
    where
        F: Fn(usize, usize, usize) -> f32 + Send + Sync + 'static,
    {
        self.days.insert(date, Box::new(field));
        self
    }

    /// A day where every cell of `slot` holds `slot as f32 + base`.
    pub fn with_slot_ramp(self, date: NaiveDate, base: f32) -> Self {
        self.with_day(date, move |slot, _, _| base + slot as f32)
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(NaiveDate, Range<usize>)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl MicrowaveSource for FakeMicrowaveSource {
    fn load_day(
        &self,
        date: NaiveDate,
        slots: Range<usize>,
        window: &GridWindow,
    ) -> RasterIoResult<MicrowaveDay> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((date, slots.clone()));
        }

        let field = self.days.get(&date).ok_or_else(|| RasterIoError::MissingGrid {
            date,
            path: PathBuf::from(format!("fake/{}", date)),
        })?;

        let mut values = Vec::with_capacity(slots.len() * window.width() * window.height());
        for slot in slots.clone() {
            for row in window.lat.0..window.lat.1 {
                for col in window.lon.0..window.lon.1 {
                    values.push(field(slot, row, col));
                }
            }
        }
        Ok(MicrowaveDay {
            date,
            slots,
            window: *window,
            values,
        })
    }
}
