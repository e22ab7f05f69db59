//! Microwave LST alignment driver.
//!
//! `align` pairs every downloaded GOES scene of a city with the microwave
//! grid of its pixels' local time and writes one NetCDF file per scene.
//! `inventory` reports which daily microwave grids are on disk.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use goes_common::{CityTable, DatasetConfig, TimestampIndex};
use mw_aligner::{inventory, AlignmentBatch, GridStatus, InventorySummary};
use raster_io::NetcdfMicrowaveSource;
use temporal_align::Aligner;

#[derive(Parser, Debug)]
#[command(name = "mw-aligner")]
#[command(about = "Align microwave LST grids with downloaded GOES scenes")]
struct Cli {
    /// Dataset configuration
    #[arg(long, global = true, env = "DATASET_CONFIG", default_value = "config/dataset.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align the downloaded scenes of one city
    Align {
        /// City name from the city table
        #[arg(long)]
        city: String,

        /// Worker threads
        #[arg(long, default_value = "4")]
        cpus: usize,

        /// Position of the first scene in the sorted scene list
        #[arg(long, default_value = "0")]
        start: usize,

        /// Number of scenes to align (default: all remaining)
        #[arg(long)]
        count: Option<usize>,

        /// City table
        #[arg(long, env = "CITIES_CONFIG", default_value = "config/cities.yaml")]
        cities: PathBuf,

        /// Override the timestamp table of the city's coverage
        #[arg(long)]
        times_csv: Option<PathBuf>,

        /// Override the scene directory (default: {raster_root}/{city})
        #[arg(long)]
        raster_dir: Option<PathBuf>,

        /// Override the output directory (default: {processed_root}/{city})
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Override the microwave grid directory
        #[arg(long)]
        microwave_dir: Option<PathBuf>,
    },

    /// Report which daily microwave grids exist
    Inventory {
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,

        /// Days between checked dates
        #[arg(long, default_value = "1")]
        step: u32,

        /// Override the microwave grid directory
        #[arg(long)]
        microwave_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
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

    let config = DatasetConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Commands::Align {
            city,
            cpus,
            start,
            count,
            cities,
            times_csv,
            raster_dir,
            output_dir,
            microwave_dir,
        } => {
            let cities = CityTable::load(&cities)
                .with_context(|| format!("loading {}", cities.display()))?;
            let city = cities.get(&city)?.clone();
            info!(city = %city.name, cpus, start, ?count, "Starting microwave alignment");

            let times_csv =
                times_csv.unwrap_or_else(|| config.paths.times_csv(city.coverage).to_path_buf());
            let timestamps = TimestampIndex::load(&times_csv, &config.paths.timestamp_column)
                .with_context(|| format!("loading {}", times_csv.display()))?;

            let raster_dir = raster_dir.unwrap_or_else(|| config.paths.raster_dir(&city.name));
            let output_dir = output_dir.unwrap_or_else(|| config.paths.processed_dir(&city.name));
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("creating {}", output_dir.display()))?;

            let microwave_dir = microwave_dir.unwrap_or_else(|| config.paths.microwave_dir.clone());
            let source = NetcdfMicrowaveSource::new(microwave_dir, config.microwave.clone());
            let aligner = Aligner::new(
                Arc::new(source),
                city,
                config.microwave.missing_dates.clone(),
            )?;

            let batch = AlignmentBatch::new(
                aligner,
                config.export.bands.clone(),
                &raster_dir,
                &output_dir,
                &timestamps,
            );
            let summary = batch
                .run(start, count, cpus)
                .with_context(|| format!("aligning scenes in {}", raster_dir.display()))?;

            info!(
                succeeded = summary.succeeded,
                known_missing = summary.known_missing,
                failed = summary.failed,
                skipped = summary.skipped,
                total_secs = summary.elapsed.as_secs_f64(),
                "Alignment session complete"
            );

            if !summary.is_success() {
                for (raster, message) in &summary.failures {
                    error!(raster = %raster.display(), error = %message, "Unrecovered alignment failure");
                }
                bail!("{} of {} scenes failed", summary.failed, summary.total());
            }
        }

        Commands::Inventory {
            from,
            to,
            step,
            microwave_dir,
        } => {
            let microwave_dir = microwave_dir.unwrap_or_else(|| config.paths.microwave_dir.clone());
            let source = NetcdfMicrowaveSource::new(&microwave_dir, config.microwave.clone());
            let entries = inventory(&source, &config.microwave, from, to, step);

            for entry in entries.iter().filter(|e| e.status != GridStatus::Present) {
                warn!(date = %entry.date, status = ?entry.status, path = %entry.path.display(), "Grid unavailable");
            }

            let summary = InventorySummary::from_entries(&entries);
            if !summary.is_complete() {
                bail!(
                    "{} of {} microwave grids missing from {}",
                    summary.missing,
                    entries.len(),
                    microwave_dir.display()
                );
            }
        }
    }

    Ok(())
}
