//! Multi-band GeoTIFF scenes as exported by the catalog.
//!
//! Only the georeferencing the pipeline relies on is interpreted: a
//! north-up pixel scale + tiepoint pair and the projected CRS geokey.

use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{RasterIoError, RasterIoResult};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

/// One named band, row-major with row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub name: String,
    pub data: Vec<f32>,
}

/// A downloaded scene: bands plus pixel-centre coordinates.
#[derive(Debug, Clone)]
pub struct RasterRecord {
    pub width: usize,
    pub height: usize,
    pub bands: Vec<Band>,
    /// Easting of each column centre (increasing).
    pub x: Vec<f64>,
    /// Northing of each row centre (decreasing).
    pub y: Vec<f64>,
    pub epsg: Option<u32>,
    pub acquired: DateTime<Utc>,
}

impl RasterRecord {
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Check coordinate and band lengths against the declared shape.
    pub fn validate(&self) -> RasterIoResult<()> {
        let checks = [
            ("x", self.width, self.x.len()),
            ("y", self.height, self.y.len()),
        ];
        for (name, expected, actual) in checks {
            if expected != actual {
                return Err(RasterIoError::ShapeMismatch {
                    name: name.to_string(),
                    expected,
                    actual,
                });
            }
        }
        for band in &self.bands {
            if band.data.len() != self.pixel_count() {
                return Err(RasterIoError::ShapeMismatch {
                    name: band.name.clone(),
                    expected: self.pixel_count(),
                    actual: band.data.len(),
                });
            }
        }
        Ok(())
    }
}

/// Read a GeoTIFF, naming its bands in file order from `band_names`.
pub fn read_geotiff(
    path: impl AsRef<Path>,
    band_names: &[String],
    acquired: DateTime<Utc>,
) -> RasterIoResult<RasterRecord> {
    let path = path.as_ref();
    let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;

    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);
    let samples = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1) as usize;
    let planar = decoder.get_tag_u32(Tag::PlanarConfiguration).unwrap_or(1);

    if samples != band_names.len() {
        return Err(RasterIoError::InvalidFormat(format!(
            "{} has {} bands, expected {}",
            path.display(),
            samples,
            band_names.len()
        )));
    }

    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE))?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT))?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(RasterIoError::MissingData(format!(
            "georeferencing tags in {}",
            path.display()
        )));
    }
    let epsg = decoder
        .get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY))
        .ok()
        .and_then(|keys| projected_epsg(&keys));

    let samples_flat = to_f32(decoder.read_image()?);
    let plane = width * height;
    if samples_flat.len() != plane * samples {
        return Err(RasterIoError::ShapeMismatch {
            name: path.display().to_string(),
            expected: plane * samples,
            actual: samples_flat.len(),
        });
    }

    let bands = band_names
        .iter()
        .enumerate()
        .map(|(b, name)| {
            let data = if planar == 2 {
                samples_flat[b * plane..(b + 1) * plane].to_vec()
            } else {
                samples_flat.iter().skip(b).step_by(samples).copied().collect()
            };
            Band {
                name: name.clone(),
                data,
            }
        })
        .collect();

    // Tiepoint maps raster (i, j) to model (x, y) at the pixel corner.
    let (tie_i, tie_j, tie_x, tie_y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    let x = (0..width)
        .map(|c| tie_x + (c as f64 - tie_i + 0.5) * scale[0])
        .collect();
    let y = (0..height)
        .map(|r| tie_y - (r as f64 - tie_j + 0.5) * scale[1])
        .collect();

    debug!(path = %path.display(), width, height, ?epsg, "Read GeoTIFF");

    let record = RasterRecord {
        width,
        height,
        bands,
        x,
        y,
        epsg,
        acquired,
    };
    record.validate()?;
    Ok(record)
}

/// Write a four-band record as a float32 GeoTIFF.
pub fn write_geotiff(path: impl AsRef<Path>, record: &RasterRecord) -> RasterIoResult<()> {
    record.validate()?;
    if record.bands.len() != 4 {
        return Err(RasterIoError::InvalidFormat(format!(
            "writer supports four bands, got {}",
            record.bands.len()
        )));
    }
    if record.width < 2 || record.height < 2 {
        return Err(RasterIoError::InvalidFormat(
            "need at least two rows and columns to derive the pixel size".into(),
        ));
    }

    let dx = record.x[1] - record.x[0];
    let dy = record.y[0] - record.y[1];
    let pixel_scale = [dx, dy, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, record.x[0] - dx / 2.0, record.y[0] + dy / 2.0, 0.0];

    let mut interleaved = Vec::with_capacity(record.pixel_count() * 4);
    for i in 0..record.pixel_count() {
        interleaved.extend(record.bands.iter().map(|b| b.data[i]));
    }

    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path.as_ref())?))?;
    let mut image =
        encoder.new_image::<colortype::RGBA32Float>(record.width as u32, record.height as u32)?;
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), &pixel_scale[..])?;
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), &tiepoint[..])?;
    if let Some(code) = record.epsg {
        // GTModelType = projected, GTRasterType = PixelIsArea, ProjectedCSType = code
        #[rustfmt::skip]
        let keys: [u16; 16] = [
            1, 1, 0, 3,
            1024, 0, 1, 1,
            1025, 0, 1, 1,
            PROJECTED_CS_TYPE_GEO_KEY, 0, 1, code as u16,
        ];
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), &keys[..])?;
    }
    image.write_data(&interleaved)?;
    Ok(())
}

fn projected_epsg(keys: &[u16]) -> Option<u32> {
    let count = *keys.get(3)? as usize;
    keys.get(4..4 + count * 4)?
        .chunks_exact(4)
        .find(|entry| entry[0] == PROJECTED_CS_TYPE_GEO_KEY && entry[1] == 0)
        .map(|entry| entry[3] as u32)
}

fn to_f32(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        // Remaining sample formats are rejected by the length check.
        _ => Vec::new(),
    }
}
