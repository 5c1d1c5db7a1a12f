//! Upstream air-quality feeds and their parsers.
//!
//! Gateway module: callers outside `feeds` only see the parse entry points,
//! the URL helpers and [`FeedSource`].

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

use crate::error::ParseResult;
use crate::models::SensorCollection;

mod api;
mod legacy;

pub use api::{api_url, parse_api, API_URL};
pub use legacy::{parse_legacy, parse_legacy_str, reconcile, DropReason, Reconciliation, JSON_URL};

// ---

/// Which upstream feed the service reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    /// Key-based sensor API with a columnar response.
    Api,
    /// Legacy community JSON feed with paired channels.
    Legacy,
}

impl FeedSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedSource::Api => "api",
            FeedSource::Legacy => "legacy",
        }
    }

    /// Parse a raw response body from this feed.
    pub fn parse(&self, body: &str) -> ParseResult<SensorCollection> {
        match self {
            FeedSource::Api => parse_api(body),
            FeedSource::Legacy => parse_legacy_str(body),
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(FeedSource::Api),
            "legacy" | "json" => Ok(FeedSource::Legacy),
            other => Err(anyhow!("unknown feed source '{}', expected 'api' or 'legacy'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feed_source_from_str() {
        // ---
        assert_eq!("api".parse::<FeedSource>().unwrap(), FeedSource::Api);
        assert_eq!(" Legacy ".parse::<FeedSource>().unwrap(), FeedSource::Legacy);
        assert_eq!("json".parse::<FeedSource>().unwrap(), FeedSource::Legacy);
        assert!("protobuf".parse::<FeedSource>().is_err());
    }

    #[test]
    fn test_feed_source_dispatches_parser() {
        // ---
        let legacy = json!({
            "results": [{
                "ID": 1, "Lat": 1.0, "Lon": 1.0, "AGE": 0,
                "Stats": json!({"v1": 1, "v2": 1, "v3": 1, "v4": 1, "v5": 1, "lastModified": 0}).to_string()
            }]
        })
        .to_string();

        assert_eq!(FeedSource::Legacy.parse(&legacy).unwrap().len(), 1);
        assert!(FeedSource::Api.parse(&legacy).is_err());
    }
}
