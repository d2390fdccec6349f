//! Selection of the currently actionable late-bus set.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::AlertThresholds;
use crate::delay::CorrelatedStop;

/// A correlated stop that passed every alert criterion.
pub type LateBusAlert<'a> = CorrelatedStop<'a>;

/// Keeps stops that are fresh relative to `now`, later than the lateness
/// threshold, and not currently `STOPPED_AT`.
///
/// Freshness is `now - timestamp <= window`; lateness is strictly greater than
/// the threshold.
pub fn filter_alerts<'a>(
    stops: Vec<CorrelatedStop<'a>>,
    now: DateTime<Utc>,
    thresholds: &AlertThresholds,
) -> Vec<LateBusAlert<'a>> {
    let window = thresholds.freshness_window();
    let candidates = stops.len();

    let alerts: Vec<_> = stops
        .into_iter()
        .filter(|s| now - s.report.timestamp <= window)
        .filter(|s| s.is_late(thresholds.lateness_minutes))
        .filter(|s| !s.report.is_stopped_at())
        .collect();

    debug!(candidates, alerts = alerts.len(), %now, "Alert filter applied");
    alerts
}
