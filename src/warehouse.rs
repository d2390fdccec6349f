//! Column contract of the analytical warehouse table for late-bus alerts, and
//! publication of alert files into the warehouse's landing area.

use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;
use crate::storage::{ObjectStore, object_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Integer,
    Float64,
    Numeric,
    Date,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Required,
    Nullable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub mode: Mode,
}

const fn col(name: &'static str, field_type: FieldType, mode: Mode) -> Column {
    Column {
        name,
        field_type,
        mode,
    }
}

pub use columns::SCHEMA;

mod columns {
    use super::FieldType::*;
    use super::Mode::*;
    use super::{Column, col};

    /// The `raw_late_buses` table, in load order.
    pub const SCHEMA: &[Column] = &[
        col("route_id", Integer, Required),
        col("service_id", Integer, Required),
        col("trip_id", String, Required),
        col("trip_headsign", String, Required),
        col("block_id", String, Required),
        col("shape_id", String, Required),
        col("wheelchair_accessible", Integer, Required),
        col("vehicle_journey_code", String, Required),
        col("agency_id", String, Required),
        col("route_short_name", String, Required),
        col("route_long_name", String, Nullable),
        col("route_type", String, Nullable),
        col("monday", Integer, Required),
        col("tuesday", Integer, Required),
        col("wednesday", Integer, Required),
        col("thursday", Integer, Required),
        col("friday", Integer, Required),
        col("saturday", Integer, Required),
        col("sunday", Integer, Required),
        col("start_date", Date, Required),
        col("end_date", Date, Required),
        col("arrival_time", Time, Required),
        col("departure_time", Time, Required),
        col("stop_id", Integer, Required),
        col("stop_sequence", Integer, Required),
        col("stop_headsign", String, Nullable),
        col("pickup_type", Integer, Nullable),
        col("drop_off_type", Integer, Nullable),
        col("shape_dist_traveled", Float64, Nullable),
        col("timepoint", Integer, Nullable),
        col("stop_code", Integer, Nullable),
        col("stop_name", String, Required),
        col("stop_lat", Float64, Required),
        col("stop_long", Float64, Required),
        col("wheelchair_boarding", Numeric, Nullable),
        col("location_type", String, Nullable),
        col("parent_station", String, Nullable),
        col("platform_code", String, Nullable),
        col("id", String, Required),
        col("route_id_live", Integer, Required),
        col("start_time", Time, Required),
        col("start_date_live", String, Required),
        col("latitude", Float64, Required),
        col("longitude", Float64, Required),
        col("current_stop", Integer, Required),
        col("current_status", Integer, Nullable),
        col("timestamp", String, Required),
        col("vehicle", String, Required),
        col("arrival_time_fixed", String, Required),
        col("departure_time_fixed", String, Required),
        col("time_diff", Float64, Required),
    ];
}

/// Schema columns absent from `header`, in schema order.
pub fn check_columns<'h>(header: impl IntoIterator<Item = &'h str>) -> Vec<&'static str> {
    let present: std::collections::HashSet<&str> = header.into_iter().map(str::trim).collect();
    SCHEMA
        .iter()
        .map(|c| c.name)
        .filter(|name| !present.contains(name))
        .collect()
}

pub fn schema_json() -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(SCHEMA)?)
}

/// Publishes alert files where the warehouse load picks them up:
/// `warehouse/<dataset>/<table>/date=<YYYY-MM-DD>/`.
pub struct WarehouseLoader<'s> {
    store: &'s dyn ObjectStore,
    dataset: String,
    table: String,
}

impl<'s> WarehouseLoader<'s> {
    pub fn new(store: &'s dyn ObjectStore, dataset: &str, table: &str) -> Self {
        Self {
            store,
            dataset: dataset.to_string(),
            table: table.to_string(),
        }
    }

    pub fn partition(&self, date: NaiveDate) -> String {
        format!(
            "warehouse/{}/{}/date={}",
            self.dataset,
            self.table,
            date.format("%Y-%m-%d")
        )
    }

    /// Uploads `alerts_csv` and the table schema into the partition for `date`.
    ///
    /// Missing schema columns are logged, not rejected: nullable timetable
    /// metadata is often absent and the load tolerates it.
    #[tracing::instrument(skip(self), fields(dataset = %self.dataset, table = %self.table))]
    pub async fn load(&self, alerts_csv: &Path, date: NaiveDate) -> Result<String> {
        let mut rdr = csv::Reader::from_path(alerts_csv)?;
        let missing = check_columns(rdr.headers()?.iter());
        if !missing.is_empty() {
            warn!(?missing, "Alert file lacks warehouse columns");
        }

        let partition = self.partition(date);
        let file_name = alerts_csv
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("late_buses.csv");
        let key = object_key(&partition, file_name);

        self.store.upload(alerts_csv, &key).await?;
        self.store
            .put_bytes(
                &object_key(&partition, "schema.json"),
                schema_json()?,
                "application/json",
            )
            .await?;

        info!(key = %key, "Late bus alerts published to warehouse");
        Ok(key)
    }
}
