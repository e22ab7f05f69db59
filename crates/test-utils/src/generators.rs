//! Test data generators for creating synthetic scene and microwave data.
//!
//! These generators create predictable, verifiable patterns that can be
//! used across the test suite.

/// Creates a brightness-temperature grid in Kelvin.
///
/// Values form a gradient from 250K (top-left) towards 310K
/// (bottom-right), offset by `offset` so each band differs.
pub fn create_brightness_grid(width: usize, height: usize, offset: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x_factor = col as f32 / width.max(1) as f32;
            let y_factor = row as f32 / height.max(1) as f32;
            data.push(250.0 + x_factor * 30.0 + y_factor * 30.0 + offset);
        }
    }
    data
}

/// Raw microwave counts (Kelvin * 50) for a `[lat][lon]` plane.
///
/// Cell value is `base + row * width + col`, so every cell is distinct.
pub fn create_raw_microwave_plane(width: usize, height: usize, base: i16) -> Vec<i16> {
    (0..width * height).map(|i| base + i as i16).collect()
}
