//! Scheduled stop times for the current service day.
//!
//! Only the join key and the two scheduled times are interpreted; every other
//! column is carried verbatim so it reaches the alert output unchanged.

use chrono::TimeDelta;
use csv::StringRecord;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::output::open_reader;

const REQUIRED_COLUMNS: [&str; 4] = ["trip_id", "stop_sequence", "arrival_time", "departure_time"];

/// Parses a GTFS service time (`H:MM:SS`) into an offset from service-day
/// midnight. Hours may be 24 or more for trips running past midnight.
pub fn parse_service_time(value: &str) -> Option<TimeDelta> {
    let mut parts = value.trim().split(':');
    let h: i64 = parts.next()?.parse().ok()?;
    let m: i64 = parts.next()?.parse().ok()?;
    let s: i64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || h < 0 || !(0..60).contains(&m) || !(0..60).contains(&s) {
        return None;
    }
    TimeDelta::try_hours(h)?
        .checked_add(&TimeDelta::try_minutes(m)?)?
        .checked_add(&TimeDelta::try_seconds(s)?)
}

/// One scheduled stop-time row.
#[derive(Debug, Clone, PartialEq)]
pub struct TimetableEntry {
    pub trip_id: String,
    pub stop_sequence: u32,
    pub arrival_time: TimeDelta,
    pub departure_time: TimeDelta,
    /// The full source row, aligned with [`Timetable::headers`].
    pub record: StringRecord,
}

/// A read-only timetable relation.
#[derive(Debug, Clone, Default)]
pub struct Timetable {
    headers: StringRecord,
    entries: Vec<TimetableEntry>,
}

struct Columns {
    trip_id: usize,
    stop_sequence: usize,
    arrival_time: usize,
    departure_time: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| Error::InvalidRecord(format!("timetable is missing column '{name}'")))
        };
        Ok(Self {
            trip_id: find(REQUIRED_COLUMNS[0])?,
            stop_sequence: find(REQUIRED_COLUMNS[1])?,
            arrival_time: find(REQUIRED_COLUMNS[2])?,
            departure_time: find(REQUIRED_COLUMNS[3])?,
        })
    }

    fn entry(&self, record: StringRecord) -> Option<TimetableEntry> {
        let field = |i: usize| record.get(i).map(str::trim);
        let trip_id = field(self.trip_id)?.to_string();
        let stop_sequence = field(self.stop_sequence)?.parse().ok()?;
        let arrival_time = parse_service_time(field(self.arrival_time)?)?;
        let departure_time = parse_service_time(field(self.departure_time)?)?;

        Some(TimetableEntry {
            trip_id,
            stop_sequence,
            arrival_time,
            departure_time,
            record,
        })
    }
}

impl Timetable {
    /// Reads a timetable from CSV with a header row.
    ///
    /// Rows whose key or times cannot be parsed are skipped: they could never
    /// join a report or produce a delay.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        let columns = Columns::locate(&headers)?;

        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for result in rdr.records() {
            match columns.entry(result?) {
                Some(entry) => entries.push(entry),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(skipped, "Timetable rows with unparseable key or times skipped");
        }
        debug!(rows = entries.len(), columns = headers.len(), "Timetable loaded");

        Ok(Self { headers, entries })
    }

    /// Reads a timetable CSV from disk; `.gz` files are decompressed.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_reader(open_reader(path)?)
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn entries(&self) -> &[TimetableEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Timetable;

    pub const HEADER: &str = "route_id,trip_id,arrival_time,departure_time,stop_id,stop_sequence,stop_name";

    /// Builds a timetable from data rows following [`HEADER`].
    pub fn timetable(rows: &[&str]) -> Timetable {
        let mut csv = String::from(HEADER);
        for row in rows {
            csv.push('\n');
            csv.push_str(row);
        }
        Timetable::from_reader(csv.as_bytes()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::timetable;
    use super::*;

    #[test]
    fn test_parse_service_time() {
        assert_eq!(parse_service_time("09:15:00"), Some(TimeDelta::minutes(9 * 60 + 15)));
        assert_eq!(parse_service_time("0:00:01"), Some(TimeDelta::seconds(1)));
        assert_eq!(parse_service_time(" 7:05:30 "), Some(TimeDelta::seconds(7 * 3600 + 5 * 60 + 30)));
    }

    #[test]
    fn test_parse_service_time_past_midnight() {
        assert_eq!(parse_service_time("24:00:00"), Some(TimeDelta::hours(24)));
        assert_eq!(parse_service_time("26:00:00"), Some(TimeDelta::hours(26)));
        assert_eq!(parse_service_time("25:30:15"), Some(TimeDelta::seconds(25 * 3600 + 30 * 60 + 15)));
    }

    #[test]
    fn test_parse_service_time_rejects_malformed() {
        for bad in ["", "09:15", "09:60:00", "09:15:61", "-1:00:00", "a:b:c", "09:15:00:00"] {
            assert_eq!(parse_service_time(bad), None, "{bad}");
        }
    }

    #[test]
    fn test_parse_service_time_rejects_overflowing_hours() {
        assert_eq!(parse_service_time("9999999999999:00:00"), None);
        assert_eq!(parse_service_time("9223372036854775807:00:00"), None);
    }

    #[test]
    fn test_overflowing_row_skipped() {
        let t = timetable(&[
            "6639,T1,9999999999999:00:00,09:16:00,1,4,A",
            "6639,T1,09:15:00,09:16:00,2,5,B",
        ]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.entries()[0].stop_sequence, 5);
    }

    #[test]
    fn test_rows_parsed_and_passed_through() {
        let t = timetable(&["6639,T1,09:15:00,09:16:00,450012345,5,Leeds Bus Station"]);

        assert_eq!(t.len(), 1);
        let e = &t.entries()[0];
        assert_eq!(e.trip_id, "T1");
        assert_eq!(e.stop_sequence, 5);
        assert_eq!(e.arrival_time, TimeDelta::minutes(555));
        assert_eq!(e.departure_time, TimeDelta::minutes(556));
        assert_eq!(e.record.get(6), Some("Leeds Bus Station"));
        assert_eq!(t.headers().len(), 7);
    }

    #[test]
    fn test_unparseable_rows_skipped() {
        let t = timetable(&[
            "6639,T1,09:15:00,09:16:00,1,5,A",
            "6639,T1,,09:20:00,2,6,B",
            "6639,T1,09:25:00,09:26:00,3,seven,C",
        ]);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_missing_required_column_is_error() {
        let csv = "trip_id,arrival_time,departure_time\nT1,09:00:00,09:00:00\n";
        let err = Timetable::from_reader(csv.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "invalid_record");
        assert!(err.to_string().contains("stop_sequence"));
    }
}
