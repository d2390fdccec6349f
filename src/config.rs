//! Run parameters: the feed area, alert thresholds, and injected credentials.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Geographic area passed to the feed endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_long: f64,
    pub max_long: f64,
}

impl Default for BoundingBox {
    /// Leeds, West Yorkshire.
    fn default() -> Self {
        Self {
            min_lat: 53.725,
            max_lat: 53.938,
            min_long: -1.712,
            max_long: -1.296,
        }
    }
}

impl BoundingBox {
    /// Formats the box the way the feed's `boundingBox` parameter expects it.
    pub fn to_query_value(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lat, self.max_lat, self.min_long, self.max_long
        )
    }
}

/// Limits deciding which correlated stops become alerts.
///
/// Built through [`AlertThresholds::new`] (or deserialized, which runs the same
/// checks) so the window is never negative and always representable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct AlertThresholds {
    /// Maximum age of a report, measured from the run's `now`.
    pub freshness_window_minutes: i64,
    /// A stop is an alert only when `time_diff` is strictly greater than this.
    pub lateness_minutes: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            freshness_window_minutes: 30,
            lateness_minutes: 10.0,
        }
    }
}

impl AlertThresholds {
    pub fn new(freshness_window_minutes: i64, lateness_minutes: f64) -> Result<Self> {
        if freshness_window_minutes < 0
            || TimeDelta::try_minutes(freshness_window_minutes).is_none()
        {
            return Err(Error::InvalidConfig(format!(
                "freshness window of {freshness_window_minutes} minutes is out of range"
            )));
        }
        if lateness_minutes.is_nan() {
            return Err(Error::InvalidConfig(
                "lateness threshold must be a number".to_string(),
            ));
        }
        Ok(Self {
            freshness_window_minutes,
            lateness_minutes,
        })
    }

    /// The freshness window as a duration. Values too large to represent
    /// saturate instead of panicking.
    pub fn freshness_window(&self) -> TimeDelta {
        TimeDelta::try_minutes(self.freshness_window_minutes.max(0)).unwrap_or(TimeDelta::MAX)
    }
}

#[derive(Deserialize)]
struct RawThresholds {
    freshness_window_minutes: i64,
    lateness_minutes: f64,
}

impl TryFrom<RawThresholds> for AlertThresholds {
    type Error = Error;

    fn try_from(raw: RawThresholds) -> Result<Self> {
        Self::new(raw.freshness_window_minutes, raw.lateness_minutes)
    }
}

/// Secrets resolved once at startup and handed to the boundary components.
#[derive(Clone)]
pub struct Credentials {
    pub feed_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("feed_api_key", &"<redacted>")
            .finish()
    }
}
