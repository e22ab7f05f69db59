//! Coordinate reference system transformations.
//!
//! Inverse WGS84 transverse Mercator (UTM) for turning projected scene
//! coordinates back into longitude and latitude.

pub mod utm;

pub use utm::{TransverseMercator, WGS84_A, WGS84_F};
