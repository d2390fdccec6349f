//! Error type shared by the feed, timetable, and storage boundaries.

use thiserror::Error;

/// Failures surfaced by the library.
///
/// Data-shape problems (duplicate reports, stale rows, unmatched trips) are
/// never errors: they are filtered out and only show up in logs.
#[derive(Error, Debug)]
pub enum Error {
    #[error("code: feed_unavailable, description: feed returned HTTP {status}")]
    FeedUnavailable { status: u16 },

    #[error("code: transport_error, description: {0}")]
    Transport(String),

    #[error("code: decode_error, description: {0}")]
    Decode(String),

    #[error("code: invalid_record, description: {0}")]
    InvalidRecord(String),

    #[error("code: storage_error, description: {0}")]
    Storage(String),

    #[error("code: invalid_config, description: {0}")]
    InvalidConfig(String),

    #[error("code: io_error, description: {0}")]
    Io(#[from] std::io::Error),

    #[error("code: csv_error, description: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::FeedUnavailable { .. } => "feed_unavailable",
            Self::Transport(_) => "transport_error",
            Self::Decode(_) => "decode_error",
            Self::InvalidRecord(_) => "invalid_record",
            Self::Storage(_) => "storage_error",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Io(_) => "io_error",
            Self::Csv(_) => "csv_error",
        }
    }

    /// Whether the caller may retry the operation that produced this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::FeedUnavailable { .. } | Self::Transport(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<prost::DecodeError> for Error {
    fn from(err: prost::DecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidRecord(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_unavailable_message() {
        let err = Error::FeedUnavailable { status: 503 };
        assert_eq!(
            err.to_string(),
            "code: feed_unavailable, description: feed returned HTTP 503"
        );
        assert_eq!(err.code(), "feed_unavailable");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::FeedUnavailable { status: 500 }.is_retryable());
        assert!(Error::Transport("connection reset".into()).is_retryable());
        assert!(!Error::Decode("bad varint".into()).is_retryable());
        assert!(!Error::InvalidRecord("missing trip_id".into()).is_retryable());
    }

    #[test]
    fn test_decode_error_conversion() {
        use prost::Message;

        let err: Error = crate::gtfs_rt::FeedMessage::decode(&[0xFF, 0xFE, 0x00, 0x01][..])
            .unwrap_err()
            .into();
        assert_eq!(err.code(), "decode_error");
    }
}
