//! GOES scene fetcher.
//!
//! Downloads the per-city four-band thermal scenes listed in the reference
//! timestamp table:
//! - One catalog query + export + download per timestamp
//! - Automatic retry with exponential backoff
//! - Bounded concurrency, existing files skipped

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use goes_common::{CityTable, DatasetConfig, TimestampIndex};
use goes_fetcher::earth_engine::resolve_access_token;
use goes_fetcher::{BatchDispatcher, EarthEngineCatalog, HttpDownloader, ImageFetcher};

/// Largest number of scenes in a reference table.
const MAX_FILES: usize = 105_120;

#[derive(Parser, Debug)]
#[command(name = "goes-fetcher")]
#[command(about = "Download per-city GOES thermal scenes from Earth Engine")]
struct Args {
    /// City name from the city table
    #[arg(long)]
    city: String,

    /// Number of files to fetch
    #[arg(long, default_value_t = MAX_FILES)]
    n: usize,

    /// Index of the first timestamp to fetch
    #[arg(long = "start-file", alias = "startFile", default_value_t = 0)]
    start_file: usize,

    /// Maximum concurrent fetches
    #[arg(long, default_value = "8")]
    cpus: usize,

    /// Dataset configuration
    #[arg(long, env = "DATASET_CONFIG", default_value = "config/dataset.yaml")]
    config: PathBuf,

    /// City table
    #[arg(long, env = "CITIES_CONFIG", default_value = "config/cities.yaml")]
    cities: PathBuf,

    /// Override the timestamp table of the city's coverage
    #[arg(long)]
    times_csv: Option<PathBuf>,

    /// Override the output directory (default: {raster_root}/{city})
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!(city = %args.city, "Starting GOES fetcher");

    let config = DatasetConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let cities = CityTable::load(&args.cities)
        .with_context(|| format!("loading {}", args.cities.display()))?;
    let city = cities.get(&args.city)?.clone();

    let times_csv = args
        .times_csv
        .clone()
        .unwrap_or_else(|| config.paths.times_csv(city.coverage).to_path_buf());
    let timestamps = TimestampIndex::load(&times_csv, &config.paths.timestamp_column)
        .with_context(|| format!("loading {}", times_csv.display()))?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.paths.raster_dir(&city.name));
    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let token = resolve_access_token(&config.earth_engine)?;
    let timeout = Duration::from_secs(config.earth_engine.request_timeout_secs);
    let catalog = EarthEngineCatalog::new(
        &config.earth_engine.endpoint,
        &config.earth_engine.project,
        token.clone(),
        timeout,
    )?;
    let downloader = HttpDownloader::new(timeout, Some(token))?;
    let fetcher = ImageFetcher::new(Arc::new(catalog), Arc::new(downloader), &config);

    let retry = fetcher.retry_policy();
    let count = args.n.min(MAX_FILES);
    info!(
        timestamps = timestamps.len(),
        start = args.start_file,
        count,
        workers = args.cpus,
        max_attempts = retry.max_attempts,
        max_backoff_secs = retry.total_backoff().as_secs(),
        output_dir = %output_dir.display(),
        "Dispatching fetches"
    );

    let dispatcher = BatchDispatcher::new(Arc::new(fetcher), timestamps, output_dir);
    let report = dispatcher
        .run(&city, args.start_file, count, args.cpus)
        .await;

    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        total_secs = report.elapsed.as_secs_f64(),
        "Fetch session complete"
    );

    if !report.is_success() {
        for (timestamp, message) in &report.failures {
            error!(timestamp = %timestamp, error = %message, "Unrecovered fetch failure");
        }
        bail!("{} of {} fetches failed", report.failed, report.total());
    }

    Ok(())
}
