//! Parallel alignment of a city's downloaded scenes.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};

use goes_common::TimestampIndex;
use raster_io::read_geotiff;
use temporal_align::{output_file_name, Aligner, LatLonGrid, MicrowaveStatus};

use crate::error::{DriverError, DriverResult};
use crate::scan::{list_rasters, resolve_timestamp};

/// One scene to align.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentTask {
    pub raster: PathBuf,
    pub acquired: DateTime<Utc>,
    pub output_path: PathBuf,
}

#[derive(Debug)]
enum TaskOutcome {
    Aligned(MicrowaveStatus),
    Skipped,
    Failed(String),
}

/// Aggregated outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub succeeded: usize,
    /// Succeeded, but on a known-missing microwave date.
    pub known_missing: usize,
    pub failed: usize,
    pub skipped: usize,
    pub elapsed: Duration,
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Aligns every downloaded scene of one city.
pub struct AlignmentBatch {
    aligner: Aligner,
    bands: Vec<String>,
    raster_dir: PathBuf,
    output_dir: PathBuf,
    by_minute: HashMap<String, DateTime<Utc>>,
}

impl AlignmentBatch {
    pub fn new(
        aligner: Aligner,
        bands: Vec<String>,
        raster_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        timestamps: &TimestampIndex,
    ) -> Self {
        Self {
            aligner,
            bands,
            raster_dir: raster_dir.into(),
            output_dir: output_dir.into(),
            by_minute: timestamps.by_minute(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Tasks for up to `count` scenes from position `start` of the sorted
    /// scene list. `None` takes every remaining scene.
    pub fn plan(&self, start: usize, count: Option<usize>) -> DriverResult<Vec<AlignmentTask>> {
        let rasters = list_rasters(&self.raster_dir)?;
        if rasters.is_empty() {
            return Err(DriverError::NoRasters(self.raster_dir.clone()));
        }

        let city = &self.aligner.city().name;
        rasters
            .into_iter()
            .skip(start)
            .take(count.unwrap_or(usize::MAX))
            .map(|raster| -> DriverResult<AlignmentTask> {
                Ok(AlignmentTask {
                    acquired: resolve_timestamp(&raster.stamp, &self.by_minute)?,
                    output_path: self
                        .output_dir
                        .join(output_file_name(city, &raster.stamp)),
                    raster: raster.path,
                })
            })
            .collect()
    }

    /// Pixel coordinates shared by every scene of the city.
    pub fn lat_lon_grid(&self, task: &AlignmentTask) -> DriverResult<LatLonGrid> {
        let record = read_geotiff(&task.raster, &self.bands, task.acquired)?;
        let zone = self.aligner.city().utm()?;
        Ok(LatLonGrid::from_record(&record, zone)?)
    }

    fn align_one(&self, task: &AlignmentTask, grid: &LatLonGrid) -> TaskOutcome {
        if task.output_path.exists() {
            debug!(path = %task.output_path.display(), "Output exists, skipping");
            return TaskOutcome::Skipped;
        }

        let result = read_geotiff(&task.raster, &self.bands, task.acquired)
            .map_err(Into::into)
            .and_then(|record| self.aligner.align(&record, grid, &task.output_path));

        match result {
            Ok(outcome) => TaskOutcome::Aligned(outcome.status),
            Err(e) => {
                error!(raster = %task.raster.display(), error = %e, "Alignment failed");
                TaskOutcome::Failed(e.to_string())
            }
        }
    }

    /// Align the planned slice on a pool of `cpus` threads.
    ///
    /// Existing outputs are skipped and a failing scene never stops the
    /// others. Only planning and the shared grid can fail the whole batch.
    #[instrument(skip(self), fields(city = %self.aligner.city().name))]
    pub fn run(&self, start: usize, count: Option<usize>, cpus: usize) -> DriverResult<BatchSummary> {
        let started = Instant::now();
        let tasks = self.plan(start, count)?;
        let mut summary = BatchSummary::default();
        let Some(first) = tasks.first() else {
            info!(start, "No scenes in the requested slice");
            return Ok(summary);
        };

        let grid = self.lat_lon_grid(first)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(cpus.max(1))
            .build()?;
        info!(
            tasks = tasks.len(),
            threads = pool.current_num_threads(),
            width = grid.width,
            height = grid.height,
            "Starting alignment batch"
        );

        let outcomes: Vec<TaskOutcome> =
            pool.install(|| tasks.par_iter().map(|t| self.align_one(t, &grid)).collect());

        for (task, outcome) in tasks.iter().zip(outcomes) {
            match outcome {
                TaskOutcome::Aligned(status) => {
                    summary.succeeded += 1;
                    if status == MicrowaveStatus::KnownMissing {
                        summary.known_missing += 1;
                    }
                }
                TaskOutcome::Skipped => summary.skipped += 1,
                TaskOutcome::Failed(message) => {
                    summary.failed += 1;
                    summary.failures.push((task.raster.clone(), message));
                }
            }
        }
        summary.elapsed = started.elapsed();

        info!(
            succeeded = summary.succeeded,
            known_missing = summary.known_missing,
            failed = summary.failed,
            skipped = summary.skipped,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Alignment batch complete"
        );
        Ok(summary)
    }
}
