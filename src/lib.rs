//! Normalization of air-quality sensor feeds into canonical readings with
//! US EPA AQI scores.
//!
//! The library is pure: it accepts already-downloaded payloads and returns a
//! [`SensorCollection`]. Fetching, storage and serving live in the binary.

pub mod aqi;
pub mod error;
pub mod feeds;
pub mod models;

pub use aqi::aqi_from_pm;
pub use error::{ParseError, ParseResult};
pub use feeds::FeedSource;
pub use models::{compact, PmWindows, SensorCollection, SensorReading};
