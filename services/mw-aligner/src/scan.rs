//! Discovery of downloaded scenes and recovery of their acquisition times.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use goes_common::time::parse_goes_time_str;
use goes_common::GeoResult;

use crate::error::{DriverError, DriverResult};

const RASTER_PREFIX: &str = "GOES_image_";
const RASTER_SUFFIX: &str = ".tif";

/// A downloaded scene file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFile {
    pub path: PathBuf,
    /// Minute stamp from the file name, `YYYYMMDDHHMM`.
    pub stamp: String,
}

/// Stamp of a `GOES_image_{YYYYMMDDHHMM}.tif` file name.
pub fn stamp_of(file_name: &str) -> Option<&str> {
    let stamp = file_name
        .strip_prefix(RASTER_PREFIX)?
        .strip_suffix(RASTER_SUFFIX)?;
    (stamp.len() == 12 && stamp.bytes().all(|b| b.is_ascii_digit())).then_some(stamp)
}

/// Scene files directly inside `dir`, sorted by stamp.
pub fn list_rasters(dir: &Path) -> DriverResult<Vec<RasterFile>> {
    let mut rasters = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| DriverError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        match stamp_of(name) {
            Some(stamp) => rasters.push(RasterFile {
                path: entry.path().to_path_buf(),
                stamp: stamp.to_string(),
            }),
            None => debug!(file = name, "Ignoring non-scene file"),
        }
    }
    rasters.sort_by(|a, b| a.stamp.cmp(&b.stamp));
    Ok(rasters)
}

/// Exact acquisition time of a scene.
///
/// File names only carry the minute; the timestamp table restores the
/// seconds. Stamps absent from the table fall back to the whole minute.
pub fn resolve_timestamp(
    stamp: &str,
    by_minute: &HashMap<String, DateTime<Utc>>,
) -> GeoResult<DateTime<Utc>> {
    match by_minute.get(stamp) {
        Some(t) => Ok(*t),
        None => {
            warn!(stamp, "Stamp not in timestamp table, using file name minute");
            parse_goes_time_str(stamp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stamp_of() {
        assert_eq!(stamp_of("GOES_image_202207011530.tif"), Some("202207011530"));
        assert_eq!(stamp_of("GOES_image_202207011530.tif.partial"), None);
        assert_eq!(stamp_of("GOES_image_2022070115.tif"), None);
        assert_eq!(stamp_of("DMV_GOES_image_202207011530.nc"), None);
        assert_eq!(stamp_of("GOES_image_20220701153x.tif"), None);
    }

    #[test]
    fn test_list_rasters_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "GOES_image_202207011545.tif",
            "GOES_image_202207011530.tif",
            "GOES_image_202207011600.tif.partial",
            "notes.txt",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("GOES_image_202207011500.tif")).unwrap();

        let rasters = list_rasters(dir.path()).unwrap();
        let stamps: Vec<_> = rasters.iter().map(|r| r.stamp.as_str()).collect();
        assert_eq!(stamps, vec!["202207011530", "202207011545"]);
        assert_eq!(
            rasters[0].path,
            dir.path().join("GOES_image_202207011530.tif")
        );
    }

    #[test]
    fn test_list_rasters_missing_dir() {
        let err = list_rasters(Path::new("/nonexistent/goes/rasters")).unwrap_err();
        assert!(matches!(err, DriverError::Scan { .. }));
    }

    #[test]
    fn test_resolve_timestamp() {
        let exact = Utc.with_ymd_and_hms(2022, 7, 1, 15, 30, 20).unwrap();
        let table: HashMap<_, _> = [("202207011530".to_string(), exact)].into_iter().collect();

        assert_eq!(resolve_timestamp("202207011530", &table).unwrap(), exact);
        assert_eq!(
            resolve_timestamp("202207011545", &table).unwrap(),
            Utc.with_ymd_and_hms(2022, 7, 1, 15, 45, 0).unwrap()
        );
        assert!(resolve_timestamp("2022x", &table).is_err());
    }
}
