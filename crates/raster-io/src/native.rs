//! Helpers around the native netcdf/HDF5 libraries.

use std::ops::Range;
use std::sync::Once;

use crate::error::{RasterIoError, RasterIoResult};

/// Hyperslab of a three-dimensional variable, in the variable's own axis order.
pub type Hyperslab = (Range<usize>, Range<usize>, Range<usize>);

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose diagnostics even when the Rust side
/// handles the error (for example when probing optional attributes). Call this
/// once at startup before any NetCDF/HDF5 operation; repeated calls are no-ops.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a documented
        // way to disable automatic error printing.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Read a hyperslab as f32 regardless of the stored numeric type.
///
/// Tries the float read first and falls back to the integer encodings the
/// microwave products are distributed with.
pub(crate) fn read_f32(var: &netcdf::Variable, slab: Hyperslab) -> RasterIoResult<Vec<f32>> {
    if let Ok(values) = var.get_values::<f32, _>(slab.clone()) {
        return Ok(values);
    }
    if let Ok(values) = var.get_values::<i16, _>(slab.clone()) {
        return Ok(values.into_iter().map(f32::from).collect());
    }
    if let Ok(values) = var.get_values::<u16, _>(slab.clone()) {
        return Ok(values.into_iter().map(f32::from).collect());
    }
    if let Ok(values) = var.get_values::<i32, _>(slab.clone()) {
        return Ok(values.into_iter().map(|v| v as f32).collect());
    }
    var.get_values::<f64, _>(slab)
        .map(|values| values.into_iter().map(|v| v as f32).collect())
        .map_err(|e| {
            RasterIoError::InvalidFormat(format!("cannot read {} as numbers: {}", var.name(), e))
        })
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

pub(crate) fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}
