//! Error types for raster file operations.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for raster I/O operations.
pub type RasterIoResult<T> = Result<T, RasterIoError>;

#[derive(Error, Debug)]
pub enum RasterIoError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// A microwave grid that should exist is absent
    #[error("Microwave grid for {date} not found at {}", path.display())]
    MissingGrid { date: NaiveDate, path: PathBuf },

    /// Missing required variable, tag or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Shape mismatch for {name}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}
