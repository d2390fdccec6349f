//! Retrieval of the raw position feed.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use crate::config::BoundingBox;
use crate::error::{Error, Result};
use bytes::Bytes;
use reqwest::StatusCode;
use tracing::{debug, warn};

/// Open Bus Data GTFS-RT endpoint.
pub const DEFAULT_FEED_URL: &str = "https://data.bus-data.dft.gov.uk/api/v1/gtfsrtdatafeed/";

/// Builds the feed URL restricted to `bbox`.
pub fn feed_url(base_url: &str, bbox: &BoundingBox) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(base_url)
        .map_err(|e| Error::InvalidRecord(format!("invalid feed url '{base_url}': {e}")))?;
    url.query_pairs_mut()
        .append_pair("boundingBox", &bbox.to_query_value());
    Ok(url)
}

/// Fetches the feed body.
///
/// Anything other than `200 OK` is [`Error::FeedUnavailable`] and the body is
/// discarded.
#[tracing::instrument(skip(client, url), fields(host = url.host_str().unwrap_or_default()))]
pub async fn fetch_feed<C: HttpClient>(client: &C, url: &reqwest::Url) -> Result<Bytes> {
    let resp = client.get(url.clone()).await?;

    let status = resp.status();
    if status != StatusCode::OK {
        warn!(status = status.as_u16(), "Feed request unsuccessful");
        return Err(Error::FeedUnavailable {
            status: status.as_u16(),
        });
    }

    let bytes = resp.bytes().await?;
    debug!(bytes = bytes.len(), "Feed bytes received");
    Ok(bytes)
}
