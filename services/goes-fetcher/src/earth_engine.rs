//! Earth Engine REST catalog.
//!
//! - scene lookup: `GET v1/projects/earthengine-public/assets/{collection}:listImages`
//! - export: `POST v1/projects/{project}/thumbnails` with an expression that
//!   selects and calibrates the bands, returning a thumbnail name whose
//!   `:getPixels` URL serves the GeoTIFF.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use goes_common::config::EarthEngineConfig;
use goes_common::MinuteWindow;

use crate::catalog::{ExportRequest, ImageCatalog, Scene};
use crate::error::{FetchError, FetchResult};

const PUBLIC_ASSETS: &str = "projects/earthengine-public/assets";

/// Access token from configuration, falling back to `EE_ACCESS_TOKEN`.
pub fn resolve_access_token(config: &EarthEngineConfig) -> FetchResult<String> {
    if !config.access_token.trim().is_empty() {
        return Ok(config.access_token.trim().to_string());
    }
    std::env::var("EE_ACCESS_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .ok_or(FetchError::MissingCredentials)
}

pub struct EarthEngineCatalog {
    client: Client,
    endpoint: String,
    project: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ListImagesResponse {
    #[serde(default)]
    images: Vec<ImageAsset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageAsset {
    name: String,
    start_time: DateTime<Utc>,
    #[serde(default)]
    properties: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailResponse {
    name: String,
}

impl EarthEngineCatalog {
    pub fn new(
        endpoint: impl Into<String>,
        project: impl Into<String>,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project: project.into(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &EarthEngineConfig) -> FetchResult<Self> {
        Self::new(
            &config.endpoint,
            &config.project,
            resolve_access_token(config)?,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn list_images_url(&self, collection: &str) -> String {
        format!("{}/v1/{}/{}:listImages", self.endpoint, PUBLIC_ASSETS, collection)
    }

    fn thumbnails_url(&self) -> String {
        format!("{}/v1/projects/{}/thumbnails", self.endpoint, self.project)
    }

    /// Download URL of a created thumbnail.
    pub fn pixels_url(&self, thumbnail_name: &str) -> String {
        format!("{}/v1/{}:getPixels", self.endpoint, thumbnail_name)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }

    async fn json_response<T: serde::de::DeserializeOwned>(
        url: &str,
        response: reqwest::Response,
    ) -> FetchResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

/// Asset id of a full asset name.
fn asset_id(name: &str) -> &str {
    name.strip_prefix(PUBLIC_ASSETS)
        .map(|id| id.trim_start_matches('/'))
        .unwrap_or(name)
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Expression graph: `load(id).select(bands) * scales + offsets`.
pub fn export_expression(request: &ExportRequest) -> Value {
    let scales: Vec<f64> = request.bands.iter().map(|b| b.scale).collect();
    let offsets: Vec<f64> = request.bands.iter().map(|b| b.offset).collect();

    let constant = |values: Vec<f64>| {
        json!({
            "functionInvocationValue": {
                "functionName": "Image.constant",
                "arguments": { "value": { "constantValue": values } }
            }
        })
    };

    let selected = json!({
        "functionInvocationValue": {
            "functionName": "Image.select",
            "arguments": {
                "input": {
                    "functionInvocationValue": {
                        "functionName": "Image.load",
                        "arguments": { "id": { "constantValue": request.scene_id } }
                    }
                },
                "bandSelectors": { "constantValue": request.band_names() }
            }
        }
    });

    let scaled = json!({
        "functionInvocationValue": {
            "functionName": "Image.multiply",
            "arguments": { "image1": selected, "image2": constant(scales) }
        }
    });

    json!({
        "result": "0",
        "values": {
            "0": {
                "functionInvocationValue": {
                    "functionName": "Image.add",
                    "arguments": { "image1": scaled, "image2": constant(offsets) }
                }
            }
        }
    })
}

/// Body of the `thumbnails` request.
pub fn thumbnail_body(request: &ExportRequest) -> Value {
    let grid = &request.grid;
    json!({
        "expression": export_expression(request),
        "fileFormat": request.file_format,
        "bandIds": request.band_names(),
        "grid": {
            "crsCode": request.crs,
            "affineTransform": {
                "scaleX": grid.scale,
                "shearX": 0.0,
                "translateX": grid.origin_x,
                "shearY": 0.0,
                "scaleY": -grid.scale,
                "translateY": grid.origin_y,
            },
            "dimensions": { "width": grid.width, "height": grid.height }
        }
    })
}

#[async_trait]
impl ImageCatalog for EarthEngineCatalog {
    #[instrument(skip(self), fields(start = %window.start))]
    async fn find_scenes(&self, collection: &str, window: MinuteWindow) -> FetchResult<Vec<Scene>> {
        let url = self.list_images_url(collection);
        let response = self
            .authorized(self.client.get(&url))
            .query(&[
                ("startTime", rfc3339(window.start)),
                ("endTime", rfc3339(window.end)),
            ])
            .send()
            .await?;
        let listed: ListImagesResponse = Self::json_response(&url, response).await?;

        let scenes: Vec<Scene> = listed
            .images
            .into_iter()
            .filter(|image| window.contains(image.start_time))
            .map(|image| Scene {
                id: asset_id(&image.name).to_string(),
                acquired: image.start_time,
                properties: image.properties,
            })
            .collect();
        debug!(count = scenes.len(), "Listed scenes");
        Ok(scenes)
    }

    #[instrument(skip(self, request), fields(scene = %request.scene_id))]
    async fn export_url(&self, request: &ExportRequest) -> FetchResult<String> {
        let url = self.thumbnails_url();
        let response = self
            .authorized(self.client.post(&url))
            .json(&thumbnail_body(request))
            .send()
            .await?;
        let thumbnail: ThumbnailResponse = Self::json_response(&url, response).await?;
        if thumbnail.name.is_empty() {
            return Err(FetchError::Catalog("thumbnail response without a name".into()));
        }
        Ok(self.pixels_url(&thumbnail.name))
    }
}
