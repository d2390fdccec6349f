//! Cleans decoded reports before they are persisted or joined.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use tracing::debug;

use crate::report::VehicleReport;

/// Drops duplicate and stale reports, keeping first-seen order.
///
/// A report is a duplicate when an earlier one shares its `report_id` or its
/// `(trip_id, current_stop, timestamp)`; exact copies satisfy both. A report
/// is stale when its UTC date differs from `today`. Neither case is an error.
pub fn normalize(reports: Vec<VehicleReport>, today: NaiveDate) -> Vec<VehicleReport> {
    let total = reports.len();
    let mut seen_ids: HashSet<String> = HashSet::with_capacity(total);
    let mut seen_keys: HashSet<(String, u32, DateTime<Utc>)> = HashSet::with_capacity(total);
    let mut stale = 0usize;
    let mut duplicates = 0usize;

    let kept: Vec<_> = reports
        .into_iter()
        .filter(|r| {
            if r.timestamp.date_naive() != today {
                stale += 1;
                return false;
            }
            let key = (r.trip_id.clone(), r.current_stop, r.timestamp);
            if seen_ids.contains(&r.report_id) || seen_keys.contains(&key) {
                duplicates += 1;
                return false;
            }
            seen_ids.insert(r.report_id.clone());
            seen_keys.insert(key);
            true
        })
        .collect();

    debug!(
        total,
        kept = kept.len(),
        stale,
        duplicates,
        %today,
        "Reports normalized"
    );
    kept
}
