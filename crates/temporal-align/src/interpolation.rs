//! Nearest-neighbour sampling of the microwave lattice.

use raster_io::GridWindow;

/// Flat index of the grid point nearest to fractional `(x, y)`.
pub fn nearest_index(width: usize, height: usize, x: f64, y: f64) -> Option<usize> {
    let col = x.round();
    let row = y.round();
    if !(col >= 0.0 && row >= 0.0) {
        return None;
    }
    let (col, row) = (col as usize, row as usize);
    if col >= width || row >= height {
        return None;
    }
    Some(row * width + col)
}

/// Nearest lattice index within `window` for each pixel position.
///
/// Resolved once per scene and reused for every slot.
pub fn nearest_lookup(window: &GridWindow, lon: &[f64], lat: &[f64]) -> Vec<Option<usize>> {
    lon.iter()
        .zip(lat)
        .map(|(&lon, &lat)| {
            let (x, y) = window.fractional_index(lon, lat);
            nearest_index(window.width(), window.height(), x, y)
        })
        .collect()
}
