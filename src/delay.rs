//! Schedule deviation for matched stops.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use tracing::warn;

use crate::matcher::ScheduleMatch;
use crate::report::VehicleReport;
use crate::timetable::TimetableEntry;

/// A matched stop with its scheduled instants resolved and its deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedStop<'a> {
    pub entry: &'a TimetableEntry,
    pub report: &'a VehicleReport,
    pub arrival_time_fixed: DateTime<Utc>,
    pub departure_time_fixed: DateTime<Utc>,
    /// Minutes the report trails the scheduled arrival; negative when early.
    pub time_diff: f64,
}

impl CorrelatedStop<'_> {
    pub fn is_late(&self, lateness_minutes: f64) -> bool {
        self.time_diff > lateness_minutes
    }
}

/// Resolves a scheduled offset against the service day.
///
/// The offset is added to midnight UTC as a duration, so `26:00:00` lands at
/// 02:00 on the following calendar day. `None` when the result falls outside
/// the representable range.
pub fn fixed_instant(service_day: NaiveDate, offset: TimeDelta) -> Option<DateTime<Utc>> {
    service_day
        .and_time(NaiveTime::MIN)
        .and_utc()
        .checked_add_signed(offset)
}

/// Signed difference `actual - scheduled` in minutes.
pub fn minutes_between(scheduled: DateTime<Utc>, actual: DateTime<Utc>) -> f64 {
    (actual - scheduled).num_milliseconds() as f64 / 60_000.0
}

/// Computes fixed instants and `time_diff` for every match.
///
/// Matches whose scheduled times cannot be anchored to `service_day` are
/// dropped with a warning.
pub fn compute_delays<'a>(
    matches: &[ScheduleMatch<'a>],
    service_day: NaiveDate,
) -> Vec<CorrelatedStop<'a>> {
    let stops: Vec<_> = matches
        .iter()
        .filter_map(|m| {
            let arrival_time_fixed = fixed_instant(service_day, m.entry.arrival_time)?;
            let departure_time_fixed = fixed_instant(service_day, m.entry.departure_time)?;
            Some(CorrelatedStop {
                entry: m.entry,
                report: m.report,
                arrival_time_fixed,
                departure_time_fixed,
                time_diff: minutes_between(arrival_time_fixed, m.report.timestamp),
            })
        })
        .collect();

    let dropped = matches.len() - stops.len();
    if dropped > 0 {
        warn!(dropped, %service_day, "Scheduled times out of range, matches dropped");
    }
    stops
}
