//! Live vehicle position records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gtfs_rt::vehicle_position::VehicleStopStatus;

/// One observed position update, flattened out of a feed entity.
///
/// `route_id_live` and `start_date_live` carry the `_live` suffix so they do
/// not collide with the timetable's own `route_id`/`start_date` columns once
/// joined. Snapshots written with the unqualified names still deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleReport {
    #[serde(rename = "id", alias = "report_id")]
    pub report_id: String,
    pub trip_id: String,
    #[serde(alias = "route_id")]
    pub route_id_live: String,
    pub start_time: String,
    #[serde(alias = "start_date")]
    pub start_date_live: String,
    pub latitude: f64,
    pub longitude: f64,
    pub current_stop: u32,
    pub current_status: i32,
    pub timestamp: DateTime<Utc>,
    pub vehicle: String,
}

impl VehicleReport {
    /// The decoded stop status, or `None` for values outside the enum.
    pub fn status(&self) -> Option<VehicleStopStatus> {
        VehicleStopStatus::try_from(self.current_status).ok()
    }

    /// A bus stopped at its stop has already arrived and is never "late arriving".
    pub fn is_stopped_at(&self) -> bool {
        self.status() == Some(VehicleStopStatus::StoppedAt)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::report;
    use super::*;

    #[test]
    fn test_status_mapping() {
        let mut r = report("T1", 5, 2024, 6, 1, 9, 28);
        assert_eq!(r.status(), Some(VehicleStopStatus::InTransitTo));
        assert!(!r.is_stopped_at());

        r.current_status = 1;
        assert_eq!(r.status(), Some(VehicleStopStatus::StoppedAt));
        assert!(r.is_stopped_at());

        r.current_status = 0;
        assert_eq!(r.status(), Some(VehicleStopStatus::IncomingAt));

        r.current_status = 9;
        assert_eq!(r.status(), None);
        assert!(!r.is_stopped_at());
    }

    #[test]
    fn test_deserialize_unqualified_column_names() {
        let data = "\
id,trip_id,route_id,start_time,start_date,latitude,longitude,current_stop,current_status,timestamp,vehicle
r1,T1,6639,22:35:00,20240422,51.56,0.23,27,2,2024-04-22T22:54:51Z,YY18TKJ
";
        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let r: VehicleReport = rdr.deserialize().next().unwrap().unwrap();

        assert_eq!(r.report_id, "r1");
        assert_eq!(r.route_id_live, "6639");
        assert_eq!(r.start_date_live, "20240422");
        assert_eq!(r.current_stop, 27);
        assert_eq!(r.timestamp.to_rfc3339(), "2024-04-22T22:54:51+00:00");
    }
}
