//! Protobuf decoding of the GTFS Realtime position feed into flat reports.

use chrono::{DateTime, Utc};
use prost::Message;
use tracing::debug;

use crate::error::Result;
use crate::gtfs_rt::vehicle_position::VehicleStopStatus;
use crate::gtfs_rt::{FeedEntity, FeedMessage};
use crate::report::VehicleReport;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns [`Error::Decode`](crate::error::Error::Decode) if the bytes are not
/// valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    Ok(FeedMessage::decode(bytes)?)
}

/// Flattens every vehicle entity in `feed` into a [`VehicleReport`].
///
/// Absent optional fields take their protobuf defaults, so a report without a
/// timestamp lands on the epoch and is later dropped as stale.
pub fn decode_reports(feed: &FeedMessage) -> Vec<VehicleReport> {
    let reports: Vec<_> = feed.entity.iter().filter_map(to_report).collect();
    debug!(
        entities = feed.entity.len(),
        reports = reports.len(),
        "Feed entities flattened"
    );
    reports
}

/// Parses `bytes` and flattens the result in one step.
pub fn decode(bytes: &[u8]) -> Result<Vec<VehicleReport>> {
    let feed = parse_feed(bytes)?;
    Ok(decode_reports(&feed))
}

fn to_report(entity: &FeedEntity) -> Option<VehicleReport> {
    let v = entity.vehicle.as_ref()?;
    let trip = v.trip.clone().unwrap_or_default();
    let position = v.position.clone().unwrap_or_default();

    Some(VehicleReport {
        report_id: entity.id.clone(),
        trip_id: trip.trip_id().to_string(),
        route_id_live: trip.route_id().to_string(),
        start_time: trip.start_time().to_string(),
        start_date_live: trip.start_date().to_string(),
        latitude: f64::from(position.latitude),
        longitude: f64::from(position.longitude),
        current_stop: v.current_stop_sequence(),
        current_status: v
            .current_status
            .unwrap_or(VehicleStopStatus::InTransitTo as i32),
        timestamp: epoch_to_utc(v.timestamp()),
        vehicle: v
            .vehicle
            .as_ref()
            .map(|d| d.id().to_string())
            .unwrap_or_default(),
    })
}

/// Out-of-range values collapse to the epoch rather than failing the decode.
fn epoch_to_utc(secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .unwrap_or_default()
}
