//! Scheduled jobs wiring the core pipeline to its collaborators.
//!
//! Each job is one pass: pull inputs from storage or the feed, run the pure
//! core, push the result back, and clean up local files.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::Path;
use tracing::{info, warn};

use crate::config::AlertThresholds;
use crate::decoder::decode;
use crate::fetch::{HttpClient, fetch_feed};
use crate::normalize::normalize;
use crate::output::{read_reports, write_alerts_file, write_reports};
use crate::pipeline::detect_late_buses;
use crate::retry::RetryPolicy;
use crate::storage::{
    LATE_BUSES_PREFIX, LIVE_LOCATION_PREFIX, ObjectStore, TIMETABLE_PREFIX, object_key,
};
use crate::timetable::Timetable;
use crate::warehouse::WarehouseLoader;

fn remove_local(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove local file"),
    }
}

/// Writes `local` with `write` and uploads it under `key`. The caller removes
/// `local` whatever the outcome.
async fn upload_written(
    store: &dyn ObjectStore,
    local: &Path,
    key: &str,
    write: impl FnOnce(&Path) -> crate::error::Result<()>,
) -> crate::error::Result<()> {
    write(local)?;
    store.upload(local, key).await
}

/// Fetches the live feed and stores today's normalized reports as
/// `live_location/<file_name>`. Returns the number of reports kept.
#[tracing::instrument(skip(client, url, store, work_dir, retry))]
pub async fn fetch_live_locations<C: HttpClient>(
    client: &C,
    url: &reqwest::Url,
    store: &dyn ObjectStore,
    work_dir: &Path,
    file_name: &str,
    now: DateTime<Utc>,
    retry: RetryPolicy,
) -> Result<usize> {
    let bytes = retry
        .run(move || fetch_feed(client, url))
        .await
        .context("fetching live positions")?;

    let reports = normalize(decode(&bytes)?, now.date_naive());
    let count = reports.len();

    let local = work_dir.join(file_name);
    let key = object_key(LIVE_LOCATION_PREFIX, file_name);
    let uploaded = upload_written(store, &local, &key, |p| write_reports(p, &reports)).await;
    remove_local(&local);
    uploaded.context("storing live positions")?;

    info!(reports = count, "Live locations stored");
    Ok(count)
}

/// File names used by [`compare_bus_times`].
#[derive(Debug, Clone)]
pub struct CompareFiles {
    pub timetable: String,
    pub live_locations: String,
    pub alerts: String,
}

impl Default for CompareFiles {
    fn default() -> Self {
        Self {
            timetable: "timetable_today.csv.gz".to_string(),
            live_locations: "live_location-leeds.csv.gz".to_string(),
            alerts: "late_buses.csv".to_string(),
        }
    }
}

/// Correlates the stored snapshot with the stored timetable and uploads the
/// alert set as `late_buses/<alerts>`. Returns the number of alerts.
#[tracing::instrument(skip(store, work_dir, thresholds))]
pub async fn compare_bus_times(
    store: &dyn ObjectStore,
    work_dir: &Path,
    files: &CompareFiles,
    now: DateTime<Utc>,
    thresholds: &AlertThresholds,
) -> Result<usize> {
    let timetable_path = store
        .download(
            &object_key(TIMETABLE_PREFIX, &files.timetable),
            &work_dir.join(&files.timetable),
        )
        .await
        .context("downloading timetable")?;
    let live_path = store
        .download(
            &object_key(LIVE_LOCATION_PREFIX, &files.live_locations),
            &work_dir.join(&files.live_locations),
        )
        .await;
    let live_path = match live_path {
        Ok(path) => path,
        Err(e) => {
            remove_local(&timetable_path);
            return Err(e).context("downloading live positions");
        }
    };

    let timetable = Timetable::load(&timetable_path);
    let reports = read_reports(&live_path);
    remove_local(&timetable_path);
    remove_local(&live_path);
    let timetable = timetable.context("reading timetable")?;
    let reports = reports.context("reading live positions")?;

    let alerts = detect_late_buses(&reports, &timetable, now, thresholds);

    let alerts_path = work_dir.join(&files.alerts);
    let uploaded = upload_written(
        store,
        &alerts_path,
        &object_key(LATE_BUSES_PREFIX, &files.alerts),
        |p| write_alerts_file(p, timetable.headers(), &alerts),
    )
    .await;
    remove_local(&alerts_path);
    uploaded.context("storing late buses")?;

    Ok(alerts.len())
}

/// Hands a stored alert file to the warehouse. Returns the published key.
#[tracing::instrument(skip(store, work_dir))]
pub async fn load_late_buses(
    store: &dyn ObjectStore,
    work_dir: &Path,
    alerts_file: &str,
    dataset: &str,
    table: &str,
    date: NaiveDate,
) -> Result<String> {
    let local = store
        .download(
            &object_key(LATE_BUSES_PREFIX, alerts_file),
            &work_dir.join(alerts_file),
        )
        .await
        .context("downloading late buses")?;

    let published = WarehouseLoader::new(store, dataset, table)
        .load(&local, date)
        .await;
    remove_local(&local);

    published.context("publishing late buses")
}
