//! Inner join of live reports against the timetable.

use std::collections::HashMap;
use tracing::debug;

use crate::report::VehicleReport;
use crate::timetable::{Timetable, TimetableEntry};

/// A report paired with the timetable row for its trip and current stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleMatch<'a> {
    pub entry: &'a TimetableEntry,
    pub report: &'a VehicleReport,
}

/// Joins on `(trip_id, stop_sequence) = (trip_id, current_stop)`.
///
/// Only pairs present on both sides survive. A report for a trip that is not
/// in the timetable, or at a stop the trip does not have, yields nothing.
/// Output follows timetable order, then report order within a key.
pub fn match_schedule<'a>(
    timetable: &'a Timetable,
    reports: &'a [VehicleReport],
) -> Vec<ScheduleMatch<'a>> {
    let mut by_key: HashMap<(&str, u32), Vec<&VehicleReport>> = HashMap::new();
    for report in reports {
        by_key
            .entry((report.trip_id.as_str(), report.current_stop))
            .or_default()
            .push(report);
    }

    let matches: Vec<_> = timetable
        .entries()
        .iter()
        .flat_map(|entry| {
            by_key
                .get(&(entry.trip_id.as_str(), entry.stop_sequence))
                .into_iter()
                .flatten()
                .copied()
                .map(move |report| ScheduleMatch { entry, report })
        })
        .collect();

    debug!(
        reports = reports.len(),
        timetable_rows = timetable.len(),
        matched = matches.len(),
        "Reports matched to timetable"
    );
    matches
}
