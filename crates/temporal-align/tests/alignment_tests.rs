//! End-to-end alignment tests against synthetic microwave grids.

use std::path::Path;
use std::sync::Arc;

use goes_common::config::MicrowaveConfig;
use raster_io::{
    read_output_attribute, read_output_variable, AttrValue, GridWindow, NetcdfMicrowaveSource,
};
use temporal_align::{AlignError, Aligner, LatLonGrid, MicrowaveStatus};
use test_utils::{
    assert_approx_eq, cities, create_raw_microwave_plane, scenes, time, FakeMicrowaveSource,
    MicrowaveFileBuilder,
};

const LONS: [f64; 3] = [-78.75, -75.0, -74.0];
const LATS: [f64; 3] = [39.0, 38.75, 38.5];

/// 3x3 pixel grid: columns at `LONS`, rows at `LATS`.
fn straddling_grid() -> LatLonGrid {
    let mut lon = Vec::new();
    let mut lat = Vec::new();
    for &y in &LATS {
        for &x in &LONS {
            lon.push(x);
            lat.push(y);
        }
    }
    LatLonGrid::new(3, 3, lon, lat)
}

fn window() -> GridWindow {
    GridWindow::covering(-78.75, -74.0, 38.5, 39.0)
}

fn aligner(source: Arc<dyn raster_io::MicrowaveSource>) -> Aligner {
    Aligner::new(
        source,
        cities::dmv(),
        MicrowaveConfig::default().missing_dates,
    )
    .unwrap()
}

fn text_attr(path: &Path, var: Option<&str>, name: &str) -> String {
    match read_output_attribute(path, var, name).unwrap() {
        Some(AttrValue::Text(s)) => s,
        other => panic!("expected text attribute {}, got {:?}", name, other),
    }
}

// ============================================================================
// Two-day scene read from files
// ============================================================================

#[test]
fn test_two_day_scene_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = MicrowaveConfig::default();
    let window = window();
    assert_eq!((window.width(), window.height()), (20, 3));

    // Jun 30 slot 95: raw 100 + row * 20 + col
    MicrowaveFileBuilder::new(time::date(2022, 6, 30))
        .with_slot(95, window, create_raw_microwave_plane(20, 3, 100))
        .write(dir.path(), &config);
    // Jul 1 slot 0: raw 200 + row * 20 + col; slot 1 must never be read
    MicrowaveFileBuilder::new(time::date(2022, 7, 1))
        .with_slot(0, window, create_raw_microwave_plane(20, 3, 200))
        .with_constant_slot(1, window, 9999)
        .write(dir.path(), &config);

    let source = NetcdfMicrowaveSource::new(dir.path(), config);
    let aligner = aligner(Arc::new(source));
    let record = scenes::dmv_scene(time::utc(2022, 7, 1, 5, 0), 3, 3);
    let grid = straddling_grid();

    let field = aligner.compute(&record, &grid).unwrap();
    assert_eq!(field.status, MicrowaveStatus::Aligned);
    assert_eq!(
        field.plan.dates,
        vec![time::date(2022, 6, 30), time::date(2022, 7, 1)]
    );

    for row in 0..3 {
        let base = row * 20;
        // -78.75 is window column 0, -75.0 column 15, -74.0 column 19
        let expected = [
            (100 + base) as f32 / 50.0,
            (200 + base + 15) as f32 / 50.0,
            (200 + base + 19) as f32 / 50.0,
        ];
        for col in 0..3 {
            assert_approx_eq!(field.values[row * 3 + col], expected[col], 1e-5);
        }
    }

    // The written output is flipped so y increases.
    let out = dir.path().join("DMV_GOES_image_202207010500.nc");
    let outcome = aligner.align(&record, &grid, &out).unwrap();
    assert_eq!(outcome.path, out);
    assert_eq!(outcome.dates.len(), 2);

    let mw = read_output_variable(&out, "microwave_LST").unwrap();
    for row in 0..3 {
        for col in 0..3 {
            assert_approx_eq!(mw[row * 3 + col], field.values[(2 - row) * 3 + col], 1e-6);
        }
    }

    let c13 = read_output_variable(&out, "GOES_C13_LWIR").unwrap();
    let band = &record.bands[0].data;
    assert_eq!(&c13[0..3], &band[6..9]);
    assert_eq!(&c13[6..9], &band[0..3]);

    let y = read_output_variable(&out, "y").unwrap();
    assert!(y[0] < y[2]);
}

#[test]
fn test_constant_grids_give_two_and_four_kelvin() {
    let dir = tempfile::tempdir().unwrap();
    let config = MicrowaveConfig::default();
    MicrowaveFileBuilder::new(time::date(2022, 6, 30))
        .with_constant_slot(95, window(), 100)
        .write(dir.path(), &config);
    MicrowaveFileBuilder::new(time::date(2022, 7, 1))
        .with_constant_slot(0, window(), 200)
        .write(dir.path(), &config);

    let aligner = aligner(Arc::new(NetcdfMicrowaveSource::new(dir.path(), config)));
    let record = scenes::dmv_scene(time::utc(2022, 7, 1, 5, 0), 3, 3);
    let field = aligner.compute(&record, &straddling_grid()).unwrap();

    for row in 0..3 {
        assert_eq!(&field.values[row * 3..row * 3 + 3], &[2.0, 4.0, 4.0]);
    }
    assert!(field.plan.indices.iter().all(|&i| i < 192));
}

#[test]
fn test_fill_values_become_nan() {
    let dir = tempfile::tempdir().unwrap();
    let config = MicrowaveConfig::default();
    // Only the -78.75 column is written; the rest reads back as fill.
    let partial = GridWindow::covering(-78.75, -78.75, 38.5, 39.0);
    MicrowaveFileBuilder::new(time::date(2022, 7, 1))
        .with_constant_slot(67, partial, 15000)
        .write(dir.path(), &config);

    let aligner = aligner(Arc::new(NetcdfMicrowaveSource::new(dir.path(), config)));
    // 22:00 UTC: -78.75 is 16:45 local (slot 67), -75 and -74 are 17:00 and 17:04 (slot 68)
    let record = scenes::dmv_scene(time::utc(2022, 7, 1, 22, 0), 3, 3);
    let field = aligner.compute(&record, &straddling_grid()).unwrap();

    assert_eq!(field.plan.dates, vec![time::date(2022, 7, 1)]);
    for row in 0..3 {
        assert_approx_eq!(field.values[row * 3], 300.0, 1e-4);
        assert!(field.values[row * 3 + 1].is_nan());
        assert!(field.values[row * 3 + 2].is_nan());
    }
}

// ============================================================================
// Slot selection
// ============================================================================

#[test]
fn test_single_day_uses_local_slots() {
    let date = time::date(2022, 7, 1);
    let source = Arc::new(FakeMicrowaveSource::new().with_slot_ramp(date, 1000.0));
    let aligner = aligner(source.clone());
    // 17:00 UTC: -78.75 -> 11:45 (47), -75 -> 12:00 (48), -74 -> 12:04 (48)
    let record = scenes::dmv_scene(time::utc(2022, 7, 1, 17, 0), 3, 3);

    let field = aligner.compute(&record, &straddling_grid()).unwrap();
    assert_eq!(field.plan.dates, vec![date]);
    for row in 0..3 {
        assert_eq!(&field.values[row * 3..row * 3 + 3], &[1047.0, 1048.0, 1048.0]);
    }
    assert_eq!(source.load_count(), 1);
    assert_eq!(source.requests(), vec![(date, 47..49)]);
}

#[test]
fn test_second_day_pixels_use_slot_minus_96() {
    let (day1, day2) = (time::date(2022, 6, 30), time::date(2022, 7, 1));
    let source = Arc::new(
        FakeMicrowaveSource::new()
            .with_slot_ramp(day1, 1000.0)
            .with_slot_ramp(day2, 2000.0),
    );
    let aligner = aligner(source.clone());
    let record = scenes::dmv_scene(time::utc(2022, 7, 1, 5, 0), 3, 3);

    let field = aligner.compute(&record, &straddling_grid()).unwrap();
    assert_eq!(field.plan.indices[..3], [95, 96, 96]);
    for row in 0..3 {
        assert_eq!(&field.values[row * 3..row * 3 + 3], &[1095.0, 2000.0, 2000.0]);
    }
    assert_eq!(source.requests(), vec![(day1, 95..96), (day2, 0..1)]);
}

#[test]
fn test_projected_grid_samples_every_pixel() {
    let date = time::date(2022, 7, 1);
    let source = Arc::new(FakeMicrowaveSource::new().with_day(date, |_, row, col| {
        (row * 10_000 + col) as f32
    }));
    let aligner = aligner(source);
    let record = scenes::dmv_scene(time::utc(2022, 7, 1, 17, 0), 5, 4);
    let grid = LatLonGrid::from_record(&record, cities::dmv().utm().unwrap()).unwrap();

    let field = aligner.compute(&record, &grid).unwrap();
    assert_eq!(field.values.len(), 20);
    assert!(field.values.iter().all(|v| v.is_finite()));
    // Upper-left pixel near (-77.4, 39.46): lattice column 410, row 201
    assert_eq!(field.values[0], (201 * 10_000 + 410) as f32);
}

// ============================================================================
// Output properties
// ============================================================================

#[test]
fn test_output_metadata() {
    let date = time::date(2022, 7, 1);
    let source = Arc::new(FakeMicrowaveSource::new().with_slot_ramp(date, 300.0));
    let aligner = aligner(source);
    let record = scenes::dmv_scene(time::utc(2022, 7, 1, 17, 0), 3, 3);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.nc");
    aligner.align(&record, &straddling_grid(), &out).unwrap();

    assert_eq!(
        text_attr(&out, None, "title"),
        "GOES-16 and microwave_LST data for Washington, DC, USA and Baltimore, Maryland, USA"
    );
    assert_eq!(
        text_attr(&out, None, "institution"),
        "University of Maryland, College Park"
    );
    assert_eq!(text_attr(&out, None, "datetime"), "2022-07-01T17:00:00Z");

    for name in ["GOES_C13_LWIR", "GOES_C14_LWIR", "GOES_C15_LWIR", "GOES_C16_LWIR"] {
        assert_eq!(
            text_attr(&out, Some(name), "standard_name"),
            "toa_brightness_temperature"
        );
        assert_eq!(text_attr(&out, Some(name), "grid_mapping"), "spatial_ref");
    }
    assert_eq!(
        read_output_attribute(&out, Some("GOES_C16_LWIR"), "valid_max").unwrap(),
        Some(AttrValue::Number(318.26))
    );
    assert_eq!(text_attr(&out, Some("GOES_C13_LWIR"), "wavelength"), "10.1-10.6 µm");
    assert_eq!(
        text_attr(&out, Some("microwave_LST"), "standard_name"),
        "surface_temperature"
    );
    assert_eq!(text_attr(&out, Some("microwave_LST"), "wavelength"), "0.81-0.83 cm");
    assert_eq!(text_attr(&out, Some("spatial_ref"), "crs_code"), "EPSG:32618");
    assert_eq!(text_attr(&out, Some("x"), "long_name"), "UTM Easting");
    assert_eq!(text_attr(&out, Some("y"), "units"), "m");
}

#[test]
fn test_realigning_is_idempotent() {
    let date = time::date(2022, 7, 1);
    let source = Arc::new(FakeMicrowaveSource::new().with_slot_ramp(date, 300.0));
    let aligner = aligner(source);
    let record = scenes::dmv_scene(time::utc(2022, 7, 1, 17, 0), 3, 3);
    let grid = straddling_grid();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.nc");
    aligner.align(&record, &grid, &out).unwrap();
    let first = read_output_variable(&out, "microwave_LST").unwrap();
    aligner.align(&record, &grid, &out).unwrap();
    let second = read_output_variable(&out, "microwave_LST").unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Missing data and errors
// ============================================================================

#[test]
fn test_known_missing_date_fills_nan_without_loading() {
    let source = Arc::new(FakeMicrowaveSource::new());
    let aligner = aligner(source.clone());
    let record = scenes::dmv_scene(time::utc(2022, 3, 22, 17, 0), 3, 3);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.nc");
    let outcome = aligner.align(&record, &straddling_grid(), &out).unwrap();

    assert_eq!(outcome.status, MicrowaveStatus::KnownMissing);
    assert_eq!(source.load_count(), 0);
    let mw = read_output_variable(&out, "microwave_LST").unwrap();
    assert_eq!(mw.len(), 9);
    assert!(mw.iter().all(|v| v.is_nan()));
    // GOES bands are still written.
    assert!(read_output_variable(&out, "GOES_C14_LWIR")
        .unwrap()
        .iter()
        .all(|v| v.is_finite()));
}

#[test]
fn test_known_missing_second_date_excludes_scene() {
    let source = Arc::new(
        FakeMicrowaveSource::new().with_slot_ramp(time::date(2022, 1, 1), 300.0),
    );
    let aligner = aligner(source.clone());
    // Straddles Dec 31 (known missing) and Jan 1
    let record = scenes::dmv_scene(time::utc(2022, 1, 1, 5, 0), 3, 3);

    let field = aligner.compute(&record, &straddling_grid()).unwrap();
    assert_eq!(field.status, MicrowaveStatus::KnownMissing);
    assert!(field.values.iter().all(|v| v.is_nan()));
    assert_eq!(source.load_count(), 0);
}

#[test]
fn test_missing_grid_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = NetcdfMicrowaveSource::new(dir.path(), MicrowaveConfig::default());
    let aligner = aligner(Arc::new(source));
    let record = scenes::dmv_scene(time::utc(2022, 7, 1, 17, 0), 3, 3);

    let out = dir.path().join("out.nc");
    let err = aligner.align(&record, &straddling_grid(), &out).unwrap_err();
    match err {
        AlignError::MissingGrid { date, path } => {
            assert_eq!(date, time::date(2022, 7, 1));
            assert!(path.ends_with("MW_LST_DTC_20220701_x1y.h5"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(!out.exists());
}

#[test]
fn test_shape_mismatch_writes_nothing() {
    let date = time::date(2022, 7, 1);
    let source = Arc::new(FakeMicrowaveSource::new().with_slot_ramp(date, 300.0));
    let aligner = aligner(source.clone());
    let record = scenes::dmv_scene(time::utc(2022, 7, 1, 17, 0), 4, 3);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.nc");
    let err = aligner.align(&record, &straddling_grid(), &out).unwrap_err();
    assert!(matches!(
        err,
        AlignError::ShapeMismatch {
            grid_width: 3,
            raster_width: 4,
            ..
        }
    ));
    assert!(!out.exists());
    assert_eq!(source.load_count(), 0);
}

#[test]
fn test_crs_mismatch_writes_nothing() {
    let date = time::date(2022, 7, 1);
    let source = Arc::new(FakeMicrowaveSource::new().with_slot_ramp(date, 300.0));
    let aligner = aligner(source.clone());
    let mut record = scenes::dmv_scene(time::utc(2022, 7, 1, 5, 0), 3, 3);
    record.epsg = Some(32617);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.nc");
    let err = aligner.align(&record, &straddling_grid(), &out).unwrap_err();
    assert!(matches!(
        err,
        AlignError::CrsMismatch {
            expected: 32618,
            found: 32617
        }
    ));
    assert!(!out.exists());
    assert_eq!(source.load_count(), 0);
}

#[test]
fn test_untagged_raster_uses_city_zone() {
    let date = time::date(2022, 7, 1);
    let source = Arc::new(FakeMicrowaveSource::new().with_slot_ramp(date, 300.0));
    let aligner = aligner(source);
    let mut record = scenes::dmv_scene(time::utc(2022, 7, 1, 17, 0), 3, 3);
    record.epsg = None;

    let grid = LatLonGrid::from_record(&record, cities::dmv().utm().unwrap()).unwrap();
    let field = aligner.compute(&record, &grid).unwrap();
    assert_eq!(field.status, MicrowaveStatus::Aligned);
}

#[test]
fn test_grid_rejects_other_zone() {
    let dmv_zone = cities::dmv().utm().unwrap();
    let mut record = scenes::dmv_scene(time::utc(2022, 7, 1, 17, 0), 3, 2);

    let grid = LatLonGrid::from_record(&record, dmv_zone).unwrap();
    assert_eq!(grid, LatLonGrid::from_projected(&record.x, &record.y, dmv_zone));

    record.epsg = Some(32617);
    let err = LatLonGrid::from_record(&record, dmv_zone).unwrap_err();
    assert!(matches!(
        err,
        AlignError::CrsMismatch {
            expected: 32618,
            found: 32617
        }
    ));

    record.epsg = Some(4326);
    assert!(LatLonGrid::from_record(&record, dmv_zone).is_err());
}
