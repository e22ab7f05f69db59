//! Scene alignment: slot planning, microwave sampling and output assembly.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use goes_common::{CityExportDescriptor, UtmZone};
use raster_io::{GridWindow, MicrowaveDay, MicrowaveSource, OutputDataset, OutputVariable, RasterRecord};

use crate::error::{AlignError, AlignResult};
use crate::interpolation::nearest_lookup;
use crate::metadata::{self, GRID_MAPPING, MICROWAVE_VARIABLE};
use crate::slots::{plan_slots, SlotPlan};
use crate::types::{check_crs, LatLonGrid};

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Where the microwave field of an output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrowaveStatus {
    Aligned,
    /// A local date is on the known-missing list; the field is all NaN.
    KnownMissing,
}

/// Microwave values for one scene, in raster orientation (row 0 at the top).
#[derive(Debug, Clone)]
pub struct AlignedField {
    pub plan: SlotPlan,
    pub values: Vec<f32>,
    pub status: MicrowaveStatus,
}

#[derive(Debug, Clone)]
pub struct AlignOutcome {
    pub path: PathBuf,
    pub dates: Vec<NaiveDate>,
    pub status: MicrowaveStatus,
}

/// `{city}_GOES_image_{stamp}.nc`
pub fn output_file_name(city: &str, stamp: &str) -> String {
    format!("{}_GOES_image_{}.nc", city, stamp)
}

/// Aligns scenes of one city against a microwave source.
pub struct Aligner {
    source: Arc<dyn MicrowaveSource>,
    city: CityExportDescriptor,
    zone: UtmZone,
    missing_dates: Vec<NaiveDate>,
}

impl Aligner {
    pub fn new(
        source: Arc<dyn MicrowaveSource>,
        city: CityExportDescriptor,
        missing_dates: Vec<NaiveDate>,
    ) -> AlignResult<Self> {
        let zone = city.utm()?;
        Ok(Self {
            source,
            city,
            zone,
            missing_dates,
        })
    }

    pub fn city(&self) -> &CityExportDescriptor {
        &self.city
    }

    /// Compute the per-pixel microwave field for `record`.
    pub fn compute(&self, record: &RasterRecord, grid: &LatLonGrid) -> AlignResult<AlignedField> {
        if !grid.matches(record.width, record.height) {
            return Err(AlignError::ShapeMismatch {
                grid_width: grid.width,
                grid_height: grid.height,
                raster_width: record.width,
                raster_height: record.height,
            });
        }
        check_crs(record, self.zone)?;

        let plan = plan_slots(record.acquired, &grid.lon)?;
        let pixels = record.pixel_count();

        if let Some(date) = plan.dates.iter().find(|d| self.missing_dates.contains(d)) {
            info!(%date, "Microwave grid is known to be missing, filling with NaN");
            return Ok(AlignedField {
                plan,
                values: vec![f32::NAN; pixels],
                status: MicrowaveStatus::KnownMissing,
            });
        }

        let (min_lon, max_lon, min_lat, max_lat) = grid.bounds();
        let window = GridWindow::covering(min_lon, max_lon, min_lat, max_lat);
        let lookup = nearest_lookup(&window, &grid.lon, &grid.lat);

        let mut days: Vec<Option<MicrowaveDay>> = Vec::with_capacity(plan.dates.len());
        for (position, date) in plan.dates.iter().enumerate() {
            let day = match plan.slot_range(position) {
                Some(slots) => Some(self.source.load_day(*date, slots, &window)?),
                None => None,
            };
            days.push(day);
        }

        let values = plan
            .indices
            .iter()
            .zip(&lookup)
            .map(|(&index, nearest)| {
                let (day, slot) = SlotPlan::split(index);
                let field = days.get(day)?.as_ref()?.slot(slot)?;
                nearest.map(|i| field[i])
            })
            .map(|v| v.unwrap_or(f32::NAN))
            .collect();

        debug!(
            dates = ?plan.dates,
            window_width = window.width(),
            window_height = window.height(),
            "Sampled microwave slots"
        );

        Ok(AlignedField {
            plan,
            values,
            status: MicrowaveStatus::Aligned,
        })
    }

    /// Assemble the output dataset, flipping rows so y increases with index.
    pub fn build_dataset(&self, record: &RasterRecord, field: &AlignedField) -> OutputDataset {
        let width = record.width;

        let mut variables: Vec<OutputVariable> = record
            .bands
            .iter()
            .map(|band| {
                let mut var = OutputVariable::new(
                    metadata::output_variable_name(&band.name),
                    flip_rows(&band.data, width),
                )
                .with_attr("standard_name", "toa_brightness_temperature")
                .with_attr("units", "K");
                if let Some(info) = metadata::channel_info(&band.name) {
                    var = var
                        .with_attr("valid_min", info.valid_min)
                        .with_attr("valid_max", info.valid_max);
                }
                var = var.with_attr("missing_value", f64::NAN);
                if let Some(info) = metadata::channel_info(&band.name) {
                    var = var.with_attr("wavelength", info.wavelength);
                }
                var.with_attr("grid_mapping", GRID_MAPPING)
            })
            .collect();

        variables.push(
            OutputVariable::new(MICROWAVE_VARIABLE, flip_rows(&field.values, width))
                .with_attr("standard_name", "surface_temperature")
                .with_attr("units", "K")
                .with_attr("missing_value", f64::NAN)
                .with_attr("wavelength", "0.81-0.83 cm")
                .with_attr("grid_mapping", GRID_MAPPING),
        );

        let zone = self.zone;
        OutputDataset {
            x: record.x.clone(),
            y: record.y.iter().rev().copied().collect(),
            x_attributes: vec![
                ("standard_name".into(), "projection_x_coordinate".into()),
                ("long_name".into(), "UTM Easting".into()),
                ("units".into(), "m".into()),
            ],
            y_attributes: vec![
                ("standard_name".into(), "projection_y_coordinate".into()),
                ("long_name".into(), "UTM Northing".into()),
                ("units".into(), "m".into()),
            ],
            variables,
            spatial_ref: Some(vec![
                ("grid_mapping_name".into(), "transverse_mercator".into()),
                ("crs_code".into(), zone.to_string().into()),
                ("utm_zone_number".into(), f64::from(zone.zone).into()),
                ("longitude_of_central_meridian".into(), zone.central_meridian().into()),
                ("latitude_of_projection_origin".into(), 0.0.into()),
                ("scale_factor_at_central_meridian".into(), 0.9996.into()),
                ("false_easting".into(), 500_000.0.into()),
                (
                    "false_northing".into(),
                    (if zone.northern { 0.0 } else { 10_000_000.0 }).into(),
                ),
            ]),
            attributes: vec![
                ("title".into(), metadata::title(&self.city).into()),
                ("institution".into(), metadata::INSTITUTION.into()),
                ("source".into(), metadata::SOURCE.into()),
                (
                    "datetime".into(),
                    record.acquired.format(DATETIME_FORMAT).to_string().into(),
                ),
                ("datetime_units".into(), "YYYY-mm-DDTHH:MM:SSZ".into()),
                ("datetime_calendar".into(), "utc".into()),
            ],
        }
    }

    /// Align one scene and write it to `output_path`.
    #[instrument(skip(self, record, grid), fields(city = %self.city.name, acquired = %record.acquired))]
    pub fn align(
        &self,
        record: &RasterRecord,
        grid: &LatLonGrid,
        output_path: &Path,
    ) -> AlignResult<AlignOutcome> {
        let field = match self.compute(record, grid) {
            Ok(field) => field,
            Err(AlignError::MissingGrid { date, path }) => {
                error!(%date, path = %path.display(), "Microwave grid file missing");
                return Err(AlignError::MissingGrid { date, path });
            }
            Err(e) => return Err(e),
        };

        self.build_dataset(record, &field).write(output_path)?;
        info!(path = %output_path.display(), status = ?field.status, "Wrote aligned scene");

        Ok(AlignOutcome {
            path: output_path.to_path_buf(),
            dates: field.plan.dates,
            status: field.status,
        })
    }
}

fn flip_rows(data: &[f32], width: usize) -> Vec<f32> {
    data.chunks(width.max(1)).rev().flatten().copied().collect()
}
