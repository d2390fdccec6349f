//! CLI entry point for the late bus tracker.
//!
//! Each subcommand is one scheduled pass: fetch live positions, compare them
//! with the timetable, or hand the resulting alerts to the warehouse. `detect`
//! runs the whole correlation locally against files.

mod infra;

use crate::infra::keys::{EnvKeyStore, KeyStore, SecretRefs, SsmKeyStore, resolve_credentials};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use late_bus_tracker::{
    config::{AlertThresholds, BoundingBox},
    decoder::decode,
    fetch::{BasicClient, DEFAULT_FEED_URL, auth::UrlParam, fetch_feed, feed_url},
    jobs::{CompareFiles, compare_bus_times, fetch_live_locations, load_late_buses},
    normalize::normalize,
    output::{log_alerts, write_alerts_file},
    pipeline::detect_late_buses,
    retry::RetryPolicy,
    storage::{LocalObjectStore, ObjectStore, S3ObjectStore},
    timetable::Timetable,
    warehouse::schema_json,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "late_bus_tracker")]
#[command(about = "Detects buses running behind their timetable", long_about = None)]
#[command(allow_negative_numbers = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// S3 bucket to use as object storage; a local directory is used otherwise
    #[arg(long)]
    s3_bucket: Option<String>,

    /// Local directory acting as object storage when no bucket is given
    #[arg(long, default_value = "store")]
    store_dir: String,

    /// Scratch directory for downloaded and generated files
    #[arg(long, default_value = ".")]
    work_dir: String,
}

#[derive(Args)]
struct ThresholdArgs {
    /// Maximum report age, in minutes before now, for an alert
    #[arg(long, default_value_t = 30)]
    freshness_minutes: i64,

    /// Minutes behind schedule a bus must exceed to be reported
    #[arg(long, default_value_t = 10.0)]
    late_minutes: f64,
}

impl ThresholdArgs {
    fn thresholds(&self) -> Result<AlertThresholds> {
        Ok(AlertThresholds::new(self.freshness_minutes, self.late_minutes)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch live vehicle positions and store today's snapshot
    FetchLive {
        #[arg(long, default_value_t = 53.725)]
        min_lat: f64,
        #[arg(long, default_value_t = 53.938)]
        max_lat: f64,
        #[arg(long, default_value_t = -1.712)]
        min_long: f64,
        #[arg(long, default_value_t = -1.296)]
        max_long: f64,

        /// Snapshot file name under live_location/
        #[arg(short, long, default_value = "live_location-leeds.csv.gz")]
        filename: String,

        /// Feed endpoint
        #[arg(long, default_value = DEFAULT_FEED_URL)]
        feed_url: String,

        /// JSON file mapping secret names to references
        #[arg(long)]
        secrets: Option<String>,

        /// Resolve secrets from SSM Parameter Store instead of the environment
        #[arg(long, default_value_t = false)]
        ssm: bool,

        /// Attempts for the feed request
        #[arg(long, default_value_t = 3)]
        retries: usize,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Compare the stored snapshot with the timetable and store late buses
    Compare {
        /// Timetable file name under current_timetable/
        #[arg(long, default_value = "timetable_today.csv.gz")]
        timetable: String,

        /// Snapshot file name under live_location/
        #[arg(long, default_value = "live_location-leeds.csv.gz")]
        live_locations: String,

        /// Alert file name under late_buses/
        #[arg(short, long, default_value = "late_buses.csv")]
        output: String,

        #[command(flatten)]
        thresholds: ThresholdArgs,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Publish a stored alert file to the warehouse landing area
    LoadWarehouse {
        /// Alert file name under late_buses/
        #[arg(long, default_value = "late_buses.csv")]
        alerts: String,

        #[arg(long, default_value = "bus_tracker")]
        dataset: String,

        #[arg(long, default_value = "raw_late_buses")]
        table: String,

        /// Partition date (YYYY-MM-DD); defaults to today in UTC
        #[arg(long)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Run the correlation locally on a feed file or URL and a timetable CSV
    Detect {
        /// Path to a feed file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Timetable CSV (optionally .gz)
        #[arg(short, long)]
        timetable: PathBuf,

        /// CSV file to write alerts to
        #[arg(short, long, default_value = "late_buses.csv")]
        output: PathBuf,

        /// Evaluate as of this instant (RFC 3339) instead of the current time
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Print the warehouse table schema as JSON
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/late_bus_tracker.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("late_bus_tracker.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::FetchLive {
            min_lat,
            max_lat,
            min_long,
            max_long,
            filename,
            feed_url: base_url,
            secrets,
            ssm,
            retries,
            store,
        } => {
            let bbox = BoundingBox {
                min_lat,
                max_lat,
                min_long,
                max_long,
            };
            let refs = match secrets {
                Some(path) => SecretRefs::load(&path)?,
                None => SecretRefs::default(),
            };
            let key_store: Box<dyn KeyStore> = if ssm {
                let config = aws_config::load_from_env().await;
                Box::new(SsmKeyStore::new(&config))
            } else {
                Box::new(EnvKeyStore)
            };
            let credentials = resolve_credentials(key_store.as_ref(), &refs, "BODS_API")
                .await
                .context("resolving feed credentials")?;

            let client = UrlParam::api_key(BasicClient::new()?, &credentials);
            let url = feed_url(&base_url, &bbox)?;
            let object_store = open_store(&store).await?;
            let retry = RetryPolicy {
                attempts: retries,
                delay: Duration::from_secs(5),
            };

            fetch_live_locations(
                &client,
                &url,
                object_store.as_ref(),
                Path::new(&store.work_dir),
                &filename,
                Utc::now(),
                retry,
            )
            .await?;
        }
        Commands::Compare {
            timetable,
            live_locations,
            output,
            thresholds,
            store,
        } => {
            let thresholds = thresholds.thresholds()?;
            let object_store = open_store(&store).await?;
            let files = CompareFiles {
                timetable,
                live_locations,
                alerts: output,
            };
            let count = compare_bus_times(
                object_store.as_ref(),
                Path::new(&store.work_dir),
                &files,
                Utc::now(),
                &thresholds,
            )
            .await?;
            info!(late_buses = count, "Comparison finished");
        }
        Commands::LoadWarehouse {
            alerts,
            dataset,
            table,
            date,
            store,
        } => {
            let object_store = open_store(&store).await?;
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            load_late_buses(
                object_store.as_ref(),
                Path::new(&store.work_dir),
                &alerts,
                &dataset,
                &table,
                date,
            )
            .await?;
        }
        Commands::Detect {
            source,
            timetable,
            output,
            now,
            thresholds,
        } => {
            let now = now.unwrap_or_else(Utc::now);
            let bytes = fetcher(&source).await?;
            let reports = normalize(decode(&bytes)?, now.date_naive());
            let timetable = Timetable::load(&timetable)
                .with_context(|| format!("reading timetable {}", timetable.display()))?;

            let thresholds = thresholds.thresholds()?;
            let alerts = detect_late_buses(&reports, &timetable, now, &thresholds);
            log_alerts(&alerts);
            write_alerts_file(&output, timetable.headers(), &alerts)?;
        }
        Commands::Schema => {
            println!("{}", String::from_utf8(schema_json()?)?);
        }
    }

    Ok(())
}

/// Loads feed data from a local file path or fetches it over HTTP.
#[tracing::instrument]
async fn fetcher(source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http") {
        let client = BasicClient::new()?;
        let url = reqwest::Url::parse(source)?;
        fetch_feed(&client, &url).await?.to_vec()
    } else {
        std::fs::read(source).with_context(|| format!("reading {source}"))?
    };
    Ok(bytes)
}

/// Picks S3 when a bucket is configured, otherwise a local directory.
async fn open_store(args: &StoreArgs) -> Result<Box<dyn ObjectStore>> {
    std::fs::create_dir_all(&args.work_dir)?;
    let store: Box<dyn ObjectStore> = match &args.s3_bucket {
        Some(bucket) => {
            info!(bucket = %bucket, "Using S3 object storage");
            Box::new(S3ObjectStore::from_env(bucket.clone()).await)
        }
        None => {
            info!(dir = %args.store_dir, "Using local object storage");
            Box::new(LocalObjectStore::new(&args.store_dir))
        }
    };
    Ok(store)
}
