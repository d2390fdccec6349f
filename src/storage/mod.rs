//! Object storage collaborator.
//!
//! The pipeline only ever uploads a local file under a key or downloads a key
//! to a local file; [`S3ObjectStore`] and [`LocalObjectStore`] provide that.

mod local;
mod s3;

pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Key prefix for live position snapshots.
pub const LIVE_LOCATION_PREFIX: &str = "live_location";
/// Key prefix for the day's timetable.
pub const TIMETABLE_PREFIX: &str = "current_timetable";
/// Key prefix for alert output.
pub const LATE_BUSES_PREFIX: &str = "late_buses";

/// Joins a prefix and file name into an object key.
pub fn object_key(prefix: &str, file_name: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), file_name)
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads the file at `local_path` under `key`.
    async fn upload(&self, local_path: &Path, key: &str) -> Result<()>;

    /// Downloads `key` to `local_path` and returns that path.
    async fn download(&self, key: &str, local_path: &Path) -> Result<PathBuf>;

    /// Uploads raw bytes under `key`.
    async fn put_bytes(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;
}
