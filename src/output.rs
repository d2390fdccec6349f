//! CSV persistence for report snapshots and the alert set.
//!
//! Paths ending in `.gz` are gzip-compressed on write and decompressed on read.

use chrono::SecondsFormat;
use csv::StringRecord;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::alerts::LateBusAlert;
use crate::error::{Error, Result};
use crate::report::VehicleReport;

/// Live-side columns appended after the timetable's own. `trip_id` is the join
/// key and only appears once, on the timetable side.
pub const LIVE_COLUMNS: [&str; 10] = [
    "id",
    "route_id_live",
    "start_time",
    "start_date_live",
    "latitude",
    "longitude",
    "current_stop",
    "current_status",
    "timestamp",
    "vehicle",
];

pub const DERIVED_COLUMNS: [&str; 3] = ["arrival_time_fixed", "departure_time_fixed", "time_diff"];

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// Opens `path` for reading, transparently decompressing `.gz` files.
pub fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    if is_gzip(path) {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn write_bytes(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(File::create(path)?, Compression::default());
        encoder.write_all(data)?;
        encoder.finish()?;
    } else {
        std::fs::write(path, data)?;
    }
    Ok(())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}

/// Writes a snapshot of normalized reports, replacing any existing file.
pub fn write_reports(path: &Path, reports: &[VehicleReport]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for report in reports {
        writer.serialize(report)?;
    }
    write_bytes(path, &finish(writer)?)?;

    debug!(path = %path.display(), rows = reports.len(), "Report snapshot written");
    Ok(())
}

/// Reads a snapshot written by [`write_reports`].
pub fn read_reports(path: &Path) -> Result<Vec<VehicleReport>> {
    let mut rdr = csv::Reader::from_reader(open_reader(path)?);
    let reports = rdr.deserialize().collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(path = %path.display(), rows = reports.len(), "Report snapshot read");
    Ok(reports)
}

/// Output header: every timetable column, then live columns, then derived ones.
pub fn alert_header(timetable_headers: &StringRecord) -> StringRecord {
    let mut header = timetable_headers.clone();
    for column in LIVE_COLUMNS.iter().chain(DERIVED_COLUMNS.iter()) {
        header.push_field(column);
    }
    header
}

fn instant(value: chrono::DateTime<chrono::Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn alert_row(alert: &LateBusAlert<'_>) -> StringRecord {
    let r = alert.report;
    let mut row = alert.entry.record.clone();
    for field in [
        r.report_id.clone(),
        r.route_id_live.clone(),
        r.start_time.clone(),
        r.start_date_live.clone(),
        r.latitude.to_string(),
        r.longitude.to_string(),
        r.current_stop.to_string(),
        r.current_status.to_string(),
        instant(r.timestamp),
        r.vehicle.clone(),
        instant(alert.arrival_time_fixed),
        instant(alert.departure_time_fixed),
        alert.time_diff.to_string(),
    ] {
        row.push_field(&field);
    }
    row
}

/// Serializes the alert set as CSV. The header is written even when empty.
pub fn write_alerts<W: Write>(
    writer: W,
    timetable_headers: &StringRecord,
    alerts: &[LateBusAlert<'_>],
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(&alert_header(timetable_headers))?;
    for alert in alerts {
        writer.write_record(&alert_row(alert))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the alert set to `path`, replacing any existing file.
pub fn write_alerts_file(
    path: &Path,
    timetable_headers: &StringRecord,
    alerts: &[LateBusAlert<'_>],
) -> Result<()> {
    let mut buf = Vec::new();
    write_alerts(&mut buf, timetable_headers, alerts)?;
    write_bytes(path, &buf)?;

    info!(path = %path.display(), alerts = alerts.len(), "Late bus alerts written");
    Ok(())
}

/// Logs one line per alert.
pub fn log_alerts(alerts: &[LateBusAlert<'_>]) {
    for a in alerts {
        info!(
            trip_id = %a.entry.trip_id,
            stop_sequence = a.entry.stop_sequence,
            route = %a.report.route_id_live,
            vehicle = %a.report.vehicle,
            scheduled = %instant(a.arrival_time_fixed),
            seen = %instant(a.report.timestamp),
            minutes_late = a.time_diff,
            "Late bus"
        );
    }
}
