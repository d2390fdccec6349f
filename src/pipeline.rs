//! The correlation pass: match, compute delays, filter.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::alerts::{LateBusAlert, filter_alerts};
use crate::config::AlertThresholds;
use crate::delay::compute_delays;
use crate::matcher::match_schedule;
use crate::report::VehicleReport;
use crate::timetable::Timetable;

/// Finds buses running late at `now`.
///
/// `reports` should already be normalized. The service day is `now`'s UTC
/// date, so timetable offsets past 24:00 resolve into the next calendar day.
pub fn detect_late_buses<'a>(
    reports: &'a [VehicleReport],
    timetable: &'a Timetable,
    now: DateTime<Utc>,
    thresholds: &AlertThresholds,
) -> Vec<LateBusAlert<'a>> {
    let matches = match_schedule(timetable, reports);
    if matches.is_empty() {
        info!(reports = reports.len(), "No reports matched the timetable");
    }

    let stops = compute_delays(&matches, now.date_naive());
    let alerts = filter_alerts(stops, now, thresholds);

    info!(
        reports = reports.len(),
        matched = matches.len(),
        late = alerts.len(),
        "Late bus detection complete"
    );
    alerts
}
