//! Error types for the batch alignment driver.

use std::path::PathBuf;
use thiserror::Error;

use goes_common::GeoError;
use raster_io::RasterIoError;
use temporal_align::AlignError;

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("no GOES rasters in {}", .0.display())]
    NoRasters(PathBuf),

    #[error("failed to scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Align(#[from] AlignError),

    #[error(transparent)]
    Raster(#[from] RasterIoError),

    #[error(transparent)]
    Config(#[from] GeoError),
}
