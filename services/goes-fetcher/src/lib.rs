//! GOES scene fetcher.
//!
//! Queries the Earth Engine catalog for the scene matching each reference
//! timestamp, exports it calibrated and reprojected to the city's UTM grid,
//! and downloads it with retry and bounded concurrency.

pub mod catalog;
pub mod dispatcher;
pub mod download;
pub mod earth_engine;
pub mod error;
pub mod fetch;

pub use catalog::{BandScaling, ExportRequest, ImageCatalog, Scene};
pub use dispatcher::{output_file_name, BatchDispatcher, BatchReport, FetchTask};
pub use download::{HttpDownloader, RasterDownloader};
pub use earth_engine::EarthEngineCatalog;
pub use error::{FetchError, FetchResult};
pub use fetch::{FetchOutcome, ImageFetcher, RetryPolicy};
