//! Errors raised while decoding upstream sensor feeds.
//!
//! Only structural problems are errors. Data-quality issues on a single
//! sensor (bad coordinates, missing windows, stale or flagged readings) drop
//! that sensor from the output and are never reported here.

use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Failure of a whole parse call; no partial collection is returned.
#[derive(Debug, Error)]
pub enum ParseError {
    /// An expected column is absent from the API `fields` table.
    #[error("missing field in API response: {0}")]
    MissingField(String),

    /// The payload does not have the expected shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The embedded `Stats` document of a legacy result failed to decode.
    #[error("malformed Stats for sensor {id}: {source}")]
    MalformedStats {
        id: i64,
        #[source]
        source: serde_json::Error,
    },

    /// Input that contradicts how the feed was partitioned; upstream corruption.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl ParseError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ParseError::MalformedPayload(msg.into())
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::MalformedPayload(err.to_string())
    }
}
