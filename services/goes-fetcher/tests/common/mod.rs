//! In-memory catalog and downloader for goes-fetcher tests.
//!
//! Provides:
//! - A catalog holding scripted scenes per collection, with injectable failures
//! - A downloader that writes a small fake GeoTIFF and tracks concurrency

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use goes_common::MinuteWindow;
use goes_fetcher::{ExportRequest, FetchError, FetchResult, ImageCatalog, RasterDownloader, Scene};
use test_utils::scenes::BAND_NAMES;

pub const FAKE_TIFF: &[u8] = b"II*\0fake tiff";

/// A scene acquired 20 s into the minute of `timestamp`, with scale/offset
/// properties for every band.
pub fn scene_for(collection: &str, timestamp: DateTime<Utc>) -> Scene {
    let acquired = MinuteWindow::containing(timestamp).start + Duration::seconds(20);
    let properties = BAND_NAMES
        .iter()
        .enumerate()
        .flat_map(|(i, band)| {
            [
                (format!("{}_scale", band), json!(0.05 + i as f64 * 0.01)),
                (format!("{}_offset", band), json!(90.0 + i as f64)),
            ]
        })
        .collect();
    Scene {
        id: format!("{}/{}", collection, acquired.format("%Y%j%H%M%S")),
        acquired,
        properties,
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    scenes: Vec<(String, Scene)>,
    /// Number of leading `find_scenes` calls that fail with HTTP 503.
    failures: AtomicU32,
    find_calls: AtomicU32,
    queries: Mutex<Vec<(String, MinuteWindow)>>,
    requests: Mutex<Vec<ExportRequest>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scene(mut self, collection: &str, scene: Scene) -> Self {
        self.scenes.push((collection.to_string(), scene));
        self
    }

    pub fn failing_first(self, failures: u32) -> Self {
        self.failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn find_calls(&self) -> u32 {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<(String, MinuteWindow)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<ExportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageCatalog for FakeCatalog {
    async fn find_scenes(&self, collection: &str, window: MinuteWindow) -> FetchResult<Vec<Scene>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap()
            .push((collection.to_string(), window));

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(FetchError::HttpStatus {
                status: 503,
                url: format!("fake://{}:listImages", collection),
            });
        }

        Ok(self
            .scenes
            .iter()
            .filter(|(c, scene)| c == collection && window.contains(scene.acquired))
            .map(|(_, scene)| scene.clone())
            .collect())
    }

    async fn export_url(&self, request: &ExportRequest) -> FetchResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(format!("fake://{}:getPixels", request.scene_id))
    }
}

/// Writes [`FAKE_TIFF`] to the destination after an optional delay.
#[derive(Default)]
pub struct FakeDownloader {
    delay: std::time::Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    downloads: AtomicUsize,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RasterDownloader for FakeDownloader {
    async fn download(&self, _url: &str, dest: &Path) -> FetchResult<u64> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = std::fs::write(dest, FAKE_TIFF).map_err(|e| FetchError::Io {
            path: dest.to_path_buf(),
            source: e,
        });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.downloads.fetch_add(1, Ordering::SeqCst);
        result.map(|_| FAKE_TIFF.len() as u64)
    }
}
