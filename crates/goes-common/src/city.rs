//! City export descriptors and the city table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::bbox::BoundingBox;
use crate::config::{expand_env_vars, ExportConfig};
use crate::crs::UtmZone;
use crate::error::{GeoError, GeoResult};

/// Which GOES position images a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coverage {
    East,
    West,
}

/// Fixed geographic parameters used to request one city's export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityExportDescriptor {
    pub name: String,
    pub utm_zone: u8,
    pub northern_hemisphere: bool,
    /// Upper-left easting of the reference scene (metres).
    pub origin_x: f64,
    /// Upper-left northing of the reference scene (metres).
    pub origin_y: f64,
    pub coverage: Coverage,
    pub display_name: String,
}

impl CityExportDescriptor {
    pub fn utm(&self) -> GeoResult<UtmZone> {
        UtmZone::new(self.utm_zone, self.northern_hemisphere)
    }

    /// Target CRS string, e.g. "EPSG:32618".
    pub fn resolve_crs(&self) -> GeoResult<String> {
        Ok(self.utm()?.to_string())
    }

    /// Export region with the default reference scene and buffer.
    pub fn resolve_region(&self) -> BoundingBox {
        self.resolve_region_with(&ExportConfig::default())
    }

    /// Square region centred on the reference scene, buffered by `export.buffer`.
    pub fn resolve_region_with(&self, export: &ExportConfig) -> BoundingBox {
        let half_extent = export.source_pixel_size * export.source_pixel_count as f64 / 2.0;
        BoundingBox::around_point(
            self.origin_x + half_extent,
            self.origin_y - half_extent,
            export.buffer,
        )
    }
}

#[derive(Debug, Deserialize)]
struct CityFile {
    cities: Vec<CityExportDescriptor>,
}

/// Immutable lookup table of city descriptors.
#[derive(Debug, Clone, Default)]
pub struct CityTable {
    cities: BTreeMap<String, CityExportDescriptor>,
}

impl CityTable {
    pub fn load(path: impl AsRef<Path>) -> GeoResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| GeoError::io(path, e))?;
        let table = Self::from_yaml(&content)?;
        debug!(path = %path.display(), cities = table.len(), "Loaded city table");
        Ok(table)
    }

    pub fn from_yaml(content: &str) -> GeoResult<Self> {
        let expanded = expand_env_vars(content)?;
        let file: CityFile = serde_yaml::from_str(&expanded)?;
        Self::from_descriptors(file.cities)
    }

    pub fn from_descriptors(descriptors: Vec<CityExportDescriptor>) -> GeoResult<Self> {
        let mut cities = BTreeMap::new();
        for city in descriptors {
            city.utm()?;
            if city.name.trim().is_empty() {
                return Err(GeoError::InvalidConfig("city name cannot be empty".into()));
            }
            if cities.contains_key(&city.name) {
                return Err(GeoError::InvalidConfig(format!(
                    "duplicate city: {}",
                    city.name
                )));
            }
            cities.insert(city.name.clone(), city);
        }
        Ok(Self { cities })
    }

    pub fn get(&self, name: &str) -> GeoResult<&CityExportDescriptor> {
        self.cities
            .get(name)
            .ok_or_else(|| GeoError::UnknownCity(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}
