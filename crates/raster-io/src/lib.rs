//! File formats of the dataset pipeline.
//!
//! - [`geotiff`]: the four-band GOES exports written by the fetcher
//! - [`microwave`]: daily 96-slot microwave LST grids (HDF5)
//! - [`writer`]: the aligned NetCDF-4 output

pub mod error;
pub mod geotiff;
pub mod microwave;
pub mod native;
pub mod writer;

pub use error::{RasterIoError, RasterIoResult};
pub use geotiff::{read_geotiff, write_geotiff, Band, RasterRecord};
pub use microwave::{GridWindow, MicrowaveDay, MicrowaveSource, NetcdfMicrowaveSource};
pub use native::silence_hdf5_errors;
pub use writer::{
    read_output_attribute, read_output_variable, AttrValue, OutputDataset, OutputVariable,
};
