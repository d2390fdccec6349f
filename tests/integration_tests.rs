use chrono::{DateTime, TimeZone, Utc};
use late_bus_tracker::config::AlertThresholds;
use late_bus_tracker::decoder::decode;
use late_bus_tracker::gtfs_rt::{
    FeedEntity, FeedHeader, FeedMessage, TripDescriptor, VehicleDescriptor, VehiclePosition,
};
use late_bus_tracker::normalize::normalize;
use late_bus_tracker::output::write_alerts;
use late_bus_tracker::pipeline::detect_late_buses;
use late_bus_tracker::timetable::Timetable;
use prost::Message;

const TIMETABLE: &str = "\
route_id,trip_id,arrival_time,departure_time,stop_id,stop_sequence,stop_name
R1,T1,09:10:00,09:10:30,A,4,Stop A
R1,T1,09:15:00,09:15:30,B,5,Stop B
R2,T2,23:30:00,23:30:00,C,7,Stop C
R3,T3,25:00:00,25:00:00,D,2,Stop D
";

fn entity(id: &str, trip: &str, stop: u32, status: i32, seen: DateTime<Utc>) -> FeedEntity {
    FeedEntity {
        id: id.to_string(),
        vehicle: Some(VehiclePosition {
            trip: Some(TripDescriptor {
                trip_id: Some(trip.to_string()),
                route_id: Some("R1".to_string()),
                ..Default::default()
            }),
            vehicle: Some(VehicleDescriptor {
                id: Some(format!("BUS-{id}")),
                ..Default::default()
            }),
            current_stop_sequence: Some(stop),
            current_status: Some(status),
            timestamp: Some(seen.timestamp() as u64),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn feed(entities: Vec<FeedEntity>) -> Vec<u8> {
    FeedMessage {
        header: FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            ..Default::default()
        },
        entity: entities,
    }
    .encode_to_vec()
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap()
}

fn run(bytes: &[u8], now: DateTime<Utc>) -> (Timetable, Vec<late_bus_tracker::report::VehicleReport>) {
    let timetable = Timetable::from_reader(TIMETABLE.as_bytes()).unwrap();
    let reports = normalize(decode(bytes).unwrap(), now.date_naive());
    (timetable, reports)
}

#[test]
fn test_late_bus_in_transit_is_reported() {
    let bytes = feed(vec![entity("e1", "T1", 5, 2, at(9, 28))]);
    let (timetable, reports) = run(&bytes, at(9, 35));

    let alerts = detect_late_buses(&reports, &timetable, at(9, 35), &AlertThresholds::default());

    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.entry.trip_id, "T1");
    assert_eq!(alert.entry.stop_sequence, 5);
    assert_eq!(alert.report.current_status, 2);
    assert_eq!(alert.time_diff, 13.0);
    assert_eq!(alert.arrival_time_fixed, at(9, 15));
}

#[test]
fn test_bus_stopped_at_its_stop_is_not_reported() {
    let bytes = feed(vec![entity("e1", "T1", 5, 1, at(9, 28))]);
    let (timetable, reports) = run(&bytes, at(9, 35));

    let alerts = detect_late_buses(&reports, &timetable, at(9, 35), &AlertThresholds::default());

    assert!(alerts.is_empty());
}

#[test]
fn test_duplicates_and_stale_reports_do_not_double_count() {
    let yesterday = Utc.with_ymd_and_hms(2024, 5, 31, 9, 28, 0).unwrap();
    let bytes = feed(vec![
        entity("e1", "T1", 5, 2, at(9, 28)),
        entity("e1", "T1", 5, 2, at(9, 28)),
        entity("e2", "T1", 5, 2, at(9, 28)),
        entity("e3", "T1", 5, 2, yesterday),
    ]);
    let (timetable, reports) = run(&bytes, at(9, 35));
    assert_eq!(reports.len(), 1);

    let alerts = detect_late_buses(&reports, &timetable, at(9, 35), &AlertThresholds::default());
    assert_eq!(alerts.len(), 1);
}

#[test]
fn test_stale_observation_outside_window_is_ignored() {
    let bytes = feed(vec![entity("e1", "T1", 5, 2, at(9, 28))]);
    let (timetable, reports) = run(&bytes, at(10, 0));

    let alerts = detect_late_buses(&reports, &timetable, at(10, 0), &AlertThresholds::default());

    assert!(alerts.is_empty());
}

#[test]
fn test_times_past_midnight_resolve_to_next_day() {
    let bytes = feed(vec![
        entity("e1", "T2", 7, 2, at(23, 50)),
        entity("e2", "T3", 2, 2, at(23, 50)),
    ]);
    let (timetable, reports) = run(&bytes, at(23, 55));

    let alerts = detect_late_buses(&reports, &timetable, at(23, 55), &AlertThresholds::default());

    // 25:00 lands at 01:00 the next day, so T3 is early rather than late.
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].entry.trip_id, "T2");
    assert_eq!(alerts[0].time_diff, 20.0);
}

#[test]
fn test_alert_csv_carries_timetable_columns() {
    let bytes = feed(vec![entity("e1", "T1", 5, 2, at(9, 28))]);
    let (timetable, reports) = run(&bytes, at(9, 35));
    let alerts = detect_late_buses(&reports, &timetable, at(9, 35), &AlertThresholds::default());

    let mut buf = Vec::new();
    write_alerts(&mut buf, timetable.headers(), &alerts).unwrap();
    let content = String::from_utf8(buf).unwrap();
    let mut lines = content.lines();

    let header = lines.next().unwrap();
    assert!(header.starts_with("route_id,trip_id,arrival_time"));
    assert!(header.ends_with("time_diff"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("R1,T1,09:15:00,09:15:30,B,5,Stop B,e1,"));
    assert!(row.ends_with(",13"));
    assert!(lines.next().is_none());
}

#[test]
fn test_malformed_feed_is_a_decode_error() {
    let err = decode(&[0xff, 0xff, 0xff]).unwrap_err();
    assert_eq!(err.code(), "decode_error");
}
