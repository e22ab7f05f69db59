//! Streaming raster download.
//!
//! The body is streamed into a `.partial` sibling of the destination and
//! renamed into place once complete, so a crash never leaves a truncated file
//! at the final path.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::error::{FetchError, FetchResult};

/// Transfers an export URL to a local file.
#[async_trait]
pub trait RasterDownloader: Send + Sync {
    /// Download `url` to `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> FetchResult<u64>;
}

/// Plain HTTP GET downloader.
pub struct HttpDownloader {
    client: Client,
    bearer_token: Option<String>,
}

impl HttpDownloader {
    pub fn new(request_timeout: Duration, bearer_token: Option<String>) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()?;
        Ok(Self {
            client,
            bearer_token,
        })
    }

    async fn stream_to_file(&self, response: reqwest::Response, path: &Path) -> FetchResult<u64> {
        let mut file = File::create(path)
            .await
            .map_err(|e| FetchError::io(path, e))?;

        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::io(path, e))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| FetchError::io(path, e))?;
        file.sync_all().await.map_err(|e| FetchError::io(path, e))?;
        Ok(written)
    }
}

#[async_trait]
impl RasterDownloader for HttpDownloader {
    #[instrument(skip(self), fields(dest = %dest.display()))]
    async fn download(&self, url: &str, dest: &Path) -> FetchResult<u64> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.bearer_token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let temp = partial_path(dest);
        let bytes = match self.stream_to_file(response, &temp).await {
            Ok(bytes) => bytes,
            Err(e) => {
                fs::remove_file(&temp).await.ok();
                return Err(e);
            }
        };

        fs::rename(&temp, dest)
            .await
            .map_err(|e| FetchError::io(dest, e))?;
        debug!(bytes, "Download completed");
        Ok(bytes)
    }
}

pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}
