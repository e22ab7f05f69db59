//! Common test fixtures.
//!
//! Pre-defined cities, scenes and times that represent common scenarios
//! in the pipeline.

/// City descriptors matching `config/cities.yaml`.
pub mod cities {
    use goes_common::{CityExportDescriptor, Coverage};

    pub fn dmv() -> CityExportDescriptor {
        CityExportDescriptor {
            name: "DMV".to_string(),
            utm_zone: 18,
            northern_hemisphere: true,
            origin_x: 292000.0,
            origin_y: 4372200.0,
            coverage: Coverage::East,
            display_name: "Washington, DC, USA and Baltimore, Maryland, USA".to_string(),
        }
    }

    pub fn seattle() -> CityExportDescriptor {
        CityExportDescriptor {
            name: "Seattle".to_string(),
            utm_zone: 10,
            northern_hemisphere: true,
            origin_x: 518589.0,
            origin_y: 5311884.0,
            coverage: Coverage::West,
            display_name: "Seattle, Washington, USA".to_string(),
        }
    }

    pub fn sao_paulo() -> CityExportDescriptor {
        CityExportDescriptor {
            name: "Sao_Paulo".to_string(),
            utm_zone: 23,
            northern_hemisphere: false,
            origin_x: 294104.0,
            origin_y: 7446208.0,
            coverage: Coverage::East,
            display_name: "Sao Paulo, Brazil".to_string(),
        }
    }
}

/// Common time values.
pub mod time {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    /// 2022-07-01T15:30:00Z
    pub const REFERENCE_STAMP: &str = "202207011530";

    pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .expect("valid test time")
    }

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    pub fn reference_time() -> DateTime<Utc> {
        utc(2022, 7, 1, 15, 30)
    }
}

/// Synthetic exported scenes.
pub mod scenes {
    use chrono::{DateTime, Utc};
    use raster_io::{Band, RasterRecord};

    use crate::generators::create_brightness_grid;

    pub const BAND_NAMES: [&str; 4] = ["CMI_C13", "CMI_C14", "CMI_C15", "CMI_C16"];

    pub fn band_names() -> Vec<String> {
        BAND_NAMES.iter().map(|s| s.to_string()).collect()
    }

    /// A four-band 2 km scene whose upper-left pixel centre is `(x0, y0)`.
    pub fn scene_at(
        acquired: DateTime<Utc>,
        width: usize,
        height: usize,
        x0: f64,
        y0: f64,
        epsg: u32,
    ) -> RasterRecord {
        let bands = BAND_NAMES
            .iter()
            .enumerate()
            .map(|(b, name)| Band {
                name: name.to_string(),
                data: create_brightness_grid(width, height, b as f32),
            })
            .collect();
        RasterRecord {
            width,
            height,
            bands,
            x: (0..width).map(|c| x0 + c as f64 * 2000.0).collect(),
            y: (0..height).map(|r| y0 - r as f64 * 2000.0).collect(),
            epsg: Some(epsg),
            acquired,
        }
    }

    /// A scene over the DMV reference area (UTM 18N).
    pub fn dmv_scene(acquired: DateTime<Utc>, width: usize, height: usize) -> RasterRecord {
        scene_at(acquired, width, height, 293000.0, 4371000.0, 32618)
    }
}
