//! Universal Transverse Mercator on the WGS84 ellipsoid.
//!
//! Uses the series expansions from Snyder, "Map Projections: A Working
//! Manual" (USGS PP 1395), pp. 60-64. Accuracy is well below a metre within
//! a few degrees of the central meridian, far finer than the 2 km grids
//! this crate projects.

use goes_common::UtmZone;
use rayon::prelude::*;

/// WGS84 semi-major axis (metres).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Transverse Mercator projection for one UTM zone.
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    pub zone: UtmZone,
    /// Central meridian in radians
    lon0: f64,
    false_northing: f64,
    e2: f64,
    ep2: f64,
}

impl TransverseMercator {
    pub fn new(zone: UtmZone) -> Self {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        Self {
            zone,
            lon0: zone.central_meridian().to_radians(),
            false_northing: if zone.northern { 0.0 } else { FALSE_NORTHING_SOUTH },
            e2,
            ep2: e2 / (1.0 - e2),
        }
    }

    /// Projected (easting, northing) in metres to geographic (lon, lat) in degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = self.ep2;

        let m = (y - self.false_northing) / K0;
        let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        // Footpoint latitude
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1) = phi1.sin_cos();
        let tan1 = phi1.tan();
        let c1 = ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let w = 1.0 - e2 * sin1 * sin1;
        let n1 = WGS84_A / w.sqrt();
        let r1 = WGS84_A * (1.0 - e2) / w.powf(1.5);
        let d = (x - FALSE_EASTING) / (n1 * K0);

        let phi = phi1
            - (n1 * tan1 / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);

        let lambda = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / cos1;

        (lambda.to_degrees(), phi.to_degrees())
    }

    /// Inverse-project every (x[col], y[row]) pixel centre.
    ///
    /// Returns row-major `(lons, lats)`, each `y.len() * x.len()` long.
    pub fn inverse_grid(&self, x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let width = x.len();
        let mut lons = vec![0.0; width * y.len()];
        let mut lats = vec![0.0; width * y.len()];

        lons.par_chunks_mut(width.max(1))
            .zip(lats.par_chunks_mut(width.max(1)))
            .zip(y.par_iter())
            .for_each(|((lon_row, lat_row), &northing)| {
                for (col, &easting) in x.iter().enumerate() {
                    let (lon, lat) = self.inverse(easting, northing);
                    lon_row[col] = lon;
                    lat_row[col] = lat;
                }
            });

        (lons, lats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(z: u8, north: bool) -> TransverseMercator {
        TransverseMercator::new(UtmZone::new(z, north).unwrap())
    }

    fn assert_lon_lat(actual: (f64, f64), expected: (f64, f64)) {
        assert!((actual.0 - expected.0).abs() < 2e-5, "lon = {}", actual.0);
        assert!((actual.1 - expected.1).abs() < 2e-5, "lat = {}", actual.1);
    }

    #[test]
    fn test_inverse_known_point() {
        // White House, 18S 323394 4307396
        assert_lon_lat(
            zone(18, true).inverse(323_394.3, 4_307_395.6),
            (-77.0365, 38.8977),
        );
    }

    #[test]
    fn test_central_meridian_on_equator() {
        let (lon, lat) = zone(18, true).inverse(500_000.0, 0.0);
        assert!((lon - -75.0).abs() < 1e-9);
        assert!(lat.abs() < 1e-9);
    }

    #[test]
    fn test_southern_hemisphere() {
        // Sao Paulo, 23K 333288 7394588
        assert_lon_lat(
            zone(23, false).inverse(333_287.9, 7_394_588.3),
            (-46.6333, -23.5505),
        );
    }

    #[test]
    fn test_dmv_pixel_centres() {
        let tm = zone(18, true);
        assert_lon_lat(tm.inverse(293_000.0, 4_371_000.0), (-77.40618, 39.46371));
        assert_lon_lat(tm.inverse(301_000.0, 4_371_000.0), (-77.31326, 39.46559));
    }

    #[test]
    fn test_inverse_grid_layout() {
        let tm = zone(18, true);
        let x = [300_000.0, 302_000.0, 304_000.0];
        let y = [4_330_000.0, 4_328_000.0];
        let (lons, lats) = tm.inverse_grid(&x, &y);
        assert_eq!(lons.len(), 6);

        let (lon, lat) = tm.inverse(304_000.0, 4_328_000.0);
        assert_eq!(lons[5], lon);
        assert_eq!(lats[5], lat);
        // East increases along a row, north decreases down a column
        assert!(lons[1] > lons[0]);
        assert!(lats[3] < lats[0]);
    }
}
