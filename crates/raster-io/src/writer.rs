//! Self-describing NetCDF-4 output for aligned scenes.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{RasterIoError, RasterIoResult};

/// Attribute value written to the output.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Number(v)
    }
}

impl From<AttrValue> for netcdf::AttributeValue {
    fn from(v: AttrValue) -> Self {
        match v {
            AttrValue::Text(s) => netcdf::AttributeValue::Str(s),
            AttrValue::Number(n) => netcdf::AttributeValue::Double(n),
        }
    }
}

pub type Attributes = Vec<(String, AttrValue)>;

/// A `(y, x)` data variable.
#[derive(Debug, Clone)]
pub struct OutputVariable {
    pub name: String,
    /// Row-major, row 0 at `y[0]`.
    pub data: Vec<f32>,
    pub attributes: Attributes,
}

impl OutputVariable {
    pub fn new(name: impl Into<String>, data: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            data,
            attributes: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }
}

/// Everything written to one output file.
#[derive(Debug, Clone, Default)]
pub struct OutputDataset {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub x_attributes: Attributes,
    pub y_attributes: Attributes,
    pub variables: Vec<OutputVariable>,
    /// Attributes of a scalar `spatial_ref` grid-mapping variable, if any.
    pub spatial_ref: Option<Attributes>,
    pub attributes: Attributes,
}

impl OutputDataset {
    /// Check every variable against the coordinate lengths.
    pub fn validate(&self) -> RasterIoResult<()> {
        let expected = self.x.len() * self.y.len();
        for var in &self.variables {
            if var.data.len() != expected {
                return Err(RasterIoError::ShapeMismatch {
                    name: var.name.clone(),
                    expected,
                    actual: var.data.len(),
                });
            }
        }
        Ok(())
    }

    /// Write to `path` atomically: a sibling `.partial` file is renamed into place.
    pub fn write(&self, path: impl AsRef<Path>) -> RasterIoResult<()> {
        self.validate()?;

        let path = path.as_ref();
        let temp = partial_path(path);
        if temp.exists() {
            std::fs::remove_file(&temp)?;
        }

        if let Err(e) = self.write_file(&temp) {
            if let Err(cleanup) = std::fs::remove_file(&temp) {
                warn!(path = %temp.display(), error = %cleanup, "Failed to remove partial output");
            }
            return Err(e);
        }

        std::fs::rename(&temp, path)?;
        debug!(path = %path.display(), variables = self.variables.len(), "Wrote output");
        Ok(())
    }

    fn write_file(&self, path: &Path) -> RasterIoResult<()> {
        let mut file = netcdf::create(path)?;
        file.add_dimension("y", self.y.len())?;
        file.add_dimension("x", self.x.len())?;

        for (name, values, attributes) in [
            ("x", &self.x, &self.x_attributes),
            ("y", &self.y, &self.y_attributes),
        ] {
            let mut var = file.add_variable::<f64>(name, &[name])?;
            var.put_values(values.as_slice(), ..)?;
            for (key, value) in attributes {
                var.put_attribute(key, value.clone())?;
            }
        }

        if let Some(attributes) = &self.spatial_ref {
            let mut var = file.add_variable::<i32>("spatial_ref", &[])?;
            for (key, value) in attributes {
                var.put_attribute(key, value.clone())?;
            }
        }

        for output in &self.variables {
            let mut var = file.add_variable::<f32>(&output.name, &["y", "x"])?;
            var.set_fill_value(f32::NAN)?;
            var.put_values(output.data.as_slice(), ..)?;
            for (key, value) in &output.attributes {
                var.put_attribute(key, value.clone())?;
            }
        }

        for (key, value) in &self.attributes {
            file.add_attribute(key, value.clone())?;
        }
        Ok(())
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Read a whole variable of an output file as f32.
pub fn read_output_variable(path: impl AsRef<Path>, name: &str) -> RasterIoResult<Vec<f32>> {
    let file = netcdf::open(path.as_ref())?;
    let var = file
        .variable(name)
        .ok_or_else(|| RasterIoError::MissingData(name.to_string()))?;
    Ok(var.get_values::<f32, _>(..)?)
}

/// Read an attribute of `variable`, or a global attribute when `variable` is `None`.
pub fn read_output_attribute(
    path: impl AsRef<Path>,
    variable: Option<&str>,
    name: &str,
) -> RasterIoResult<Option<AttrValue>> {
    let file = netcdf::open(path.as_ref())?;
    let value = match variable {
        Some(v) => {
            let var = file
                .variable(v)
                .ok_or_else(|| RasterIoError::MissingData(v.to_string()))?;
            if !var.attributes().any(|a| a.name() == name) {
                return Ok(None);
            }
            var.attribute_value(name).transpose()?
        }
        None => match file.attribute(name) {
            Some(attr) => Some(attr.value()?),
            None => None,
        },
    };
    Ok(value.and_then(|v| match v {
        netcdf::AttributeValue::Str(s) => Some(AttrValue::Text(s)),
        netcdf::AttributeValue::Double(d) => Some(AttrValue::Number(d)),
        netcdf::AttributeValue::Float(f) => Some(AttrValue::Number(f as f64)),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> OutputDataset {
        OutputDataset {
            x: vec![1000.0, 3000.0],
            y: vec![5000.0, 7000.0, 9000.0],
            x_attributes: vec![("units".into(), "m".into())],
            y_attributes: vec![("units".into(), "m".into())],
            variables: vec![OutputVariable::new("field", (0..6).map(|v| v as f32).collect())
                .with_attr("units", "K")
                .with_attr("valid_min", 0.0)],
            spatial_ref: Some(vec![("grid_mapping_name".into(), "transverse_mercator".into())]),
            attributes: vec![("title".into(), "test output".into())],
        }
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/a/DMV_GOES_image_202207011530.nc")),
            PathBuf::from("/tmp/a/DMV_GOES_image_202207011530.nc.partial")
        );
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.nc");
        dataset().write(&path).unwrap();

        assert!(path.exists());
        assert!(!partial_path(&path).exists());
        assert_eq!(
            read_output_variable(&path, "field").unwrap(),
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]
        );
        assert_eq!(
            read_output_attribute(&path, Some("field"), "units").unwrap(),
            Some(AttrValue::Text("K".into()))
        );
        assert_eq!(
            read_output_attribute(&path, None, "title").unwrap(),
            Some(AttrValue::Text("test output".into()))
        );
        assert_eq!(read_output_attribute(&path, Some("field"), "absent").unwrap(), None);
    }

    #[test]
    fn test_shape_mismatch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.nc");
        let mut bad = dataset();
        bad.variables[0].data.truncate(5);

        let err = bad.write(&path).unwrap_err();
        assert!(matches!(err, RasterIoError::ShapeMismatch { expected: 6, actual: 5, .. }));
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }
}
