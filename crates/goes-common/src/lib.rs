//! Common types shared by the GOES fetcher and the microwave aligner.

pub mod bbox;
pub mod city;
pub mod config;
pub mod crs;
pub mod error;
pub mod time;
pub mod timestamps;

pub use bbox::{BoundingBox, ExportGrid};
pub use city::{CityExportDescriptor, CityTable, Coverage};
pub use config::{DatasetConfig, SatelliteConfig};
pub use crs::UtmZone;
pub use error::{GeoError, GeoResult};
pub use time::{DayIterator, MinuteWindow};
pub use timestamps::TimestampIndex;
