//! Error types for temporal alignment.

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use raster_io::RasterIoError;

pub type AlignResult<T> = Result<T, AlignError>;

#[derive(Error, Debug)]
pub enum AlignError {
    /// A microwave grid that is not on the known-missing list is absent.
    #[error("microwave grid for {date} missing at {}", path.display())]
    MissingGrid { date: NaiveDate, path: PathBuf },

    /// The pixel grid does not match the raster it is applied to.
    #[error("pixel grid is {grid_width}x{grid_height} but raster is {raster_width}x{raster_height}")]
    ShapeMismatch {
        grid_width: usize,
        grid_height: usize,
        raster_width: usize,
        raster_height: usize,
    },

    /// The raster is tagged with a different UTM zone than the city's.
    #[error("raster is in EPSG:{found} but the city grid is EPSG:{expected}")]
    CrsMismatch { expected: u32, found: u32 },

    /// Pixels fall on more than two, or non-consecutive, local dates.
    #[error("invalid local timeline: {0:?}")]
    InvalidTimeline(Vec<NaiveDate>),

    #[error("city error: {0}")]
    City(#[from] goes_common::GeoError),

    #[error(transparent)]
    RasterIo(RasterIoError),
}

impl From<RasterIoError> for AlignError {
    fn from(e: RasterIoError) -> Self {
        match e {
            RasterIoError::MissingGrid { date, path } => AlignError::MissingGrid { date, path },
            other => AlignError::RasterIo(other),
        }
    }
}
