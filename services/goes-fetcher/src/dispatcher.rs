//! Batch dispatch of fetch tasks with bounded concurrency.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};

use goes_common::time::goes_time_str;
use goes_common::{CityExportDescriptor, TimestampIndex};

use crate::fetch::ImageFetcher;

/// `GOES_image_{YYYYMMDDHHMM}.tif`
pub fn output_file_name(timestamp: DateTime<Utc>) -> String {
    format!("GOES_image_{}.tif", goes_time_str(timestamp))
}

/// One scene to fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTask {
    pub timestamp: DateTime<Utc>,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
enum TaskOutcome {
    Succeeded,
    Skipped,
    Failed(String),
}

/// Aggregated outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub elapsed: Duration,
    /// Timestamp and error message of every failed task.
    pub failures: Vec<(DateTime<Utc>, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

pub struct BatchDispatcher {
    fetcher: Arc<ImageFetcher>,
    timestamps: TimestampIndex,
    output_dir: PathBuf,
}

impl BatchDispatcher {
    pub fn new(
        fetcher: Arc<ImageFetcher>,
        timestamps: TimestampIndex,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            timestamps,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Tasks for `count` timestamps from `start_index`, clamped to the index.
    pub fn plan(&self, start_index: usize, count: usize) -> Vec<FetchTask> {
        self.timestamps
            .slice(start_index, count)
            .iter()
            .map(|&timestamp| FetchTask {
                timestamp,
                output_path: self.output_dir.join(output_file_name(timestamp)),
            })
            .collect()
    }

    /// Fetch the planned slice with at most `workers` tasks in flight.
    ///
    /// Existing outputs are skipped. A failing task never cancels the others.
    #[instrument(skip(self, city), fields(city = %city.name))]
    pub async fn run(
        &self,
        city: &CityExportDescriptor,
        start_index: usize,
        count: usize,
        workers: usize,
    ) -> BatchReport {
        let started = Instant::now();
        let tasks = self.plan(start_index, count);
        info!(tasks = tasks.len(), workers, "Starting fetch batch");

        let outcomes: Vec<(DateTime<Utc>, TaskOutcome)> = stream::iter(tasks)
            .map(|task| {
                let fetcher = self.fetcher.clone();
                async move {
                    if task.output_path.exists() {
                        debug!(path = %task.output_path.display(), "Output exists, skipping");
                        return (task.timestamp, TaskOutcome::Skipped);
                    }
                    match fetcher.fetch(city, task.timestamp, &task.output_path).await {
                        Ok(_) => (task.timestamp, TaskOutcome::Succeeded),
                        Err(e) => {
                            error!(timestamp = %task.timestamp, error = %e, "Fetch failed");
                            (task.timestamp, TaskOutcome::Failed(e.to_string()))
                        }
                    }
                }
            })
            .buffer_unordered(workers.max(1))
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (timestamp, outcome) in outcomes {
            match outcome {
                TaskOutcome::Succeeded => report.succeeded += 1,
                TaskOutcome::Skipped => report.skipped += 1,
                TaskOutcome::Failed(message) => {
                    report.failed += 1;
                    report.failures.push((timestamp, message));
                }
            }
        }
        report.failures.sort_by_key(|(t, _)| *t);
        report.elapsed = started.elapsed();

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Fetch batch complete"
        );
        report
    }
}
