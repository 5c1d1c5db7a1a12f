//! Parser for the legacy community JSON feed.
//!
//! Every physical sensor reports through two channels. Channel A is the
//! primary result; channel B carries a `ParentID` pointing at the `ID` of its
//! channel A. Channel B is only used when the upstream source has flagged
//! channel A as anomalous.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{ParseError, ParseResult};
use crate::models::{PmWindows, SensorCollection, SensorReading};

/// Default location of the legacy feed.
pub const JSON_URL: &str = "https://www.purpleair.com/json";

/// Results that have not reported for longer than this are ignored.
const MAX_AGE_SECS: i64 = 300;

const LOCATION_OUTSIDE: &str = "outside";

type LegacyResult = Map<String, Value>;

// ---

/// Outcome of reconciling one channel A result with its channel B partner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reconciliation<'a> {
    /// Channel A is valid and unflagged.
    Primary(&'a LegacyResult),
    /// Channel A is flagged; its valid, unflagged channel B is used instead.
    Fallback(&'a LegacyResult),
    /// Nothing is emitted for this sensor.
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Inside, stale, or missing location or stats.
    Invalid,
    /// Flagged, and no clean channel B to fall back to.
    FlaggedWithoutFallback,
}

/// The embedded `Stats` document: PM2.5 averages `v1`..`v5` for the
/// 10m/30m/1h/6h/24h windows.
#[derive(Debug, Deserialize)]
struct Stats {
    v1: f64,
    v2: f64,
    v3: f64,
    v4: f64,
    v5: f64,
    #[serde(rename = "lastModified")]
    last_modified: f64,
}

struct Channels<'a> {
    primary: Vec<&'a LegacyResult>,
    /// Channel B results keyed by `ParentID`. Later duplicates replace earlier ones.
    secondary: HashMap<i64, &'a LegacyResult>,
}

/// Parse an already-decoded legacy feed payload.
pub fn parse_legacy(payload: &Value) -> ParseResult<SensorCollection> {
    // ---
    let results = payload
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| ParseError::malformed("legacy payload has no results array"))?;

    let channels = split_channels(results)?;

    let mut sensors = Vec::with_capacity(channels.primary.len());
    let mut fallbacks = 0;
    let mut dropped = 0;
    for &result in &channels.primary {
        match reconcile(result, &channels.secondary)? {
            Reconciliation::Primary(chosen) => sensors.push(parse_result(chosen)?),
            Reconciliation::Fallback(chosen) => {
                fallbacks += 1;
                sensors.push(parse_result(chosen)?);
            }
            Reconciliation::Dropped(reason) => {
                dropped += 1;
                trace!(id = ?result.get("ID"), ?reason, "Dropping legacy sensor");
            }
        }
    }

    debug!(
        channel_a = channels.primary.len(),
        channel_b = channels.secondary.len(),
        kept = sensors.len(),
        fallbacks,
        dropped,
        "Parsed legacy feed"
    );
    Ok(sensors.into())
}

/// Parse the raw text of a legacy feed response.
pub fn parse_legacy_str(data: &str) -> ParseResult<SensorCollection> {
    let payload: Value = serde_json::from_str(data)?;
    parse_legacy(&payload)
}

fn split_channels(results: &[Value]) -> ParseResult<Channels<'_>> {
    // ---
    let mut channels = Channels {
        primary: Vec::new(),
        secondary: HashMap::new(),
    };

    for value in results {
        let result = value.as_object().ok_or_else(|| {
            ParseError::malformed(format!("legacy result is not an object: {}", value))
        })?;
        match result.get("ParentID") {
            // A ParentID that is not an integer can never match a channel A `ID`.
            Some(parent) => match as_int(parent, "ParentID") {
                Ok(parent) => {
                    channels.secondary.insert(parent, result);
                }
                Err(_) => {
                    trace!(
                        id = ?result.get("ID"),
                        %parent,
                        "Dropping channel B result with unusable ParentID"
                    );
                }
            },
            None => channels.primary.push(result),
        }
    }
    Ok(channels)
}

/// Decide which channel, if any, represents the sensor behind `result`.
///
/// `result` must be a channel A result; one carrying a `ParentID` means the
/// feed was partitioned from corrupt input and is reported as an
/// [`ParseError::InvariantViolation`].
pub fn reconcile<'a>(
    result: &'a LegacyResult,
    channel_b: &HashMap<i64, &'a LegacyResult>,
) -> ParseResult<Reconciliation<'a>> {
    // ---
    if let Some(parent) = result.get("ParentID") {
        return Err(ParseError::InvariantViolation(format!(
            "channel A result {:?} carries ParentID {}",
            result.get("ID"),
            parent
        )));
    }

    if !is_valid(result)? {
        return Ok(Reconciliation::Dropped(DropReason::Invalid));
    }
    if !is_flagged(result) {
        return Ok(Reconciliation::Primary(result));
    }

    let id = as_int(field(result, "ID")?, "ID")?;
    if let Some(&secondary) = channel_b.get(&id) {
        if is_valid(secondary)? && !is_flagged(secondary) {
            return Ok(Reconciliation::Fallback(secondary));
        }
    }
    Ok(Reconciliation::Dropped(DropReason::FlaggedWithoutFallback))
}

fn is_valid(result: &LegacyResult) -> ParseResult<bool> {
    // ---
    match result.get("DEVICE_LOCATIONTYPE") {
        None => {}
        Some(Value::String(location)) if location == LOCATION_OUTSIDE => {}
        Some(_) => return Ok(false),
    }

    if as_int(field(result, "AGE")?, "AGE")? > MAX_AGE_SECS {
        return Ok(false);
    }

    Ok(["Lat", "Lon", "Stats"]
        .iter()
        .all(|key| result.contains_key(*key)))
}

fn is_flagged(result: &LegacyResult) -> bool {
    result.get("Flag").is_some_and(is_truthy)
}

fn parse_result(result: &LegacyResult) -> ParseResult<SensorReading> {
    // ---
    let id = as_int(field(result, "ID")?, "ID")?;
    let latitude = as_float(field(result, "Lat")?, "Lat")?;
    let longitude = as_float(field(result, "Lon")?, "Lon")?;

    let stats_text = field(result, "Stats")?
        .as_str()
        .ok_or_else(|| ParseError::malformed(format!("Stats of sensor {} is not a string", id)))?;
    let stats: Stats = serde_json::from_str(stats_text)
        .map_err(|source| ParseError::MalformedStats { id, source })?;

    let rh = result
        .get("humidity")
        .map(|value| as_float(value, "humidity"))
        .transpose()?;

    let windows = PmWindows {
        pm_10m: stats.v1,
        pm_30m: stats.v2,
        pm_1h: stats.v3,
        pm_6h: stats.v4,
        pm_24h: stats.v5,
    };
    Ok(SensorReading::from_pm(
        id,
        latitude,
        longitude,
        windows,
        rh,
        stats.last_modified as i64,
    ))
}

// ---

fn field<'a>(result: &'a LegacyResult, name: &str) -> ParseResult<&'a Value> {
    result.get(name).ok_or_else(|| {
        ParseError::malformed(format!("legacy result {:?} has no {}", result.get("ID"), name))
    })
}

/// Integers arrive as JSON numbers or numeric strings depending on the feed
/// generation. Fractional numbers are truncated.
fn as_int(value: &Value, name: &str) -> ParseResult<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ParseError::malformed(format!("{} is not an integer: {}", name, value)))
}

fn as_float(value: &Value, name: &str) -> ParseResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ParseError::malformed(format!("{} is not a number: {}", name, value)))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
