pub mod alerts;
pub mod config;
pub mod decoder;
pub mod delay;
pub mod error;
pub mod fetch;
pub mod jobs;
pub mod matcher;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod storage;
pub mod timetable;
pub mod warehouse;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
