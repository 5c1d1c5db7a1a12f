//! Parser for the key-based sensor API (`/v1/sensors`).
//!
//! The API answers with a columnar table: a `fields` array naming the columns
//! and a `data` array of rows. Column positions are resolved once per call
//! into [`Columns`], then every row is decoded into a typed [`ApiRow`].

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{ParseError, ParseResult};
use crate::models::{PmWindows, SensorCollection, SensorReading};

/// Default endpoint of the sensor API.
pub const API_URL: &str = "https://api.purpleair.com/v1/sensors";

/// Readings older than this many seconds are filtered out by the API itself.
const MAX_AGE_SECS: u32 = 300;

/// `location_type=0` asks for outside sensors only.
const LOCATION_OUTSIDE: u32 = 0;

/// Columns requested from the API; every one must come back in `fields`.
pub const API_FIELDS: [&str; 10] = [
    "sensor_index",
    "latitude",
    "longitude",
    "humidity",
    "pm2.5_10minute",
    "pm2.5_30minute",
    "pm2.5_60minute",
    "pm2.5_6hour",
    "pm2.5_24hour",
    "last_seen",
];

// ---

/// Build the download URL for the sensor API with the given key.
pub fn api_url(base_url: &str, api_key: &str) -> Result<reqwest::Url> {
    // ---
    let max_age = MAX_AGE_SECS.to_string();
    let location_type = LOCATION_OUTSIDE.to_string();
    let fields = API_FIELDS.join(",");

    reqwest::Url::parse_with_params(
        base_url,
        &[
            ("api_key", api_key),
            ("max_age", max_age.as_str()),
            ("location_type", location_type.as_str()),
            ("fields", fields.as_str()),
        ],
    )
    .with_context(|| format!("Invalid sensor API base URL '{}'", base_url))
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    fields: Vec<String>,
    data: Vec<Vec<Value>>,
}

/// Column index of every field in [`API_FIELDS`].
#[derive(Debug)]
struct Columns {
    sensor_index: usize,
    latitude: usize,
    longitude: usize,
    humidity: usize,
    pm: [usize; 5],
    last_seen: usize,
}

impl Columns {
    fn from_fields(fields: &[String]) -> ParseResult<Self> {
        // ---
        let index = |name: &str| {
            fields
                .iter()
                .position(|f| f == name)
                .ok_or_else(|| ParseError::MissingField(name.to_string()))
        };

        Ok(Columns {
            sensor_index: index("sensor_index")?,
            latitude: index("latitude")?,
            longitude: index("longitude")?,
            humidity: index("humidity")?,
            pm: [
                index("pm2.5_10minute")?,
                index("pm2.5_30minute")?,
                index("pm2.5_60minute")?,
                index("pm2.5_6hour")?,
                index("pm2.5_24hour")?,
            ],
            last_seen: index("last_seen")?,
        })
    }
}

/// One decoded row. Zero and null numbers are both `None`.
#[derive(Debug)]
struct ApiRow {
    sensor_index: Option<i64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    humidity: Option<f64>,
    pm: [Option<f64>; 5],
    last_seen: Option<i64>,
}

impl ApiRow {
    fn decode(row: &[Value], columns: &Columns, row_no: usize) -> ParseResult<Self> {
        // ---
        let cell = |idx: usize| {
            row.get(idx).ok_or_else(|| {
                ParseError::malformed(format!(
                    "row {} has {} cells, missing column {}",
                    row_no,
                    row.len(),
                    idx
                ))
            })
        };

        let mut pm = [None; 5];
        for (slot, &idx) in pm.iter_mut().zip(&columns.pm) {
            *slot = nonzero_f64(cell(idx)?, row_no)?;
        }

        Ok(ApiRow {
            sensor_index: optional_i64(cell(columns.sensor_index)?, row_no)?,
            latitude: nonzero_f64(cell(columns.latitude)?, row_no)?,
            longitude: nonzero_f64(cell(columns.longitude)?, row_no)?,
            humidity: optional_f64(cell(columns.humidity)?, row_no)?,
            pm,
            last_seen: optional_i64(cell(columns.last_seen)?, row_no)?,
        })
    }

    /// Build a reading, or `None` when the sensor lacks a location or any
    /// of the five PM windows.
    fn into_reading(self, row_no: usize) -> ParseResult<Option<SensorReading>> {
        // ---
        let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
            trace!(row = row_no, "Dropping sensor without location");
            return Ok(None);
        };
        let [Some(pm_10m), Some(pm_30m), Some(pm_1h), Some(pm_6h), Some(pm_24h)] = self.pm else {
            trace!(row = row_no, "Dropping sensor with incomplete PM2.5 windows");
            return Ok(None);
        };

        let id = self
            .sensor_index
            .ok_or_else(|| ParseError::malformed(format!("row {} has no sensor_index", row_no)))?;
        let last_seen = self
            .last_seen
            .ok_or_else(|| ParseError::malformed(format!("row {} has no last_seen", row_no)))?;

        let windows = PmWindows {
            pm_10m,
            pm_30m,
            pm_1h,
            pm_6h,
            pm_24h,
        };
        Ok(Some(SensorReading::from_pm(
            id,
            latitude,
            longitude,
            windows,
            self.humidity,
            last_seen,
        )))
    }
}

/// Parse the raw text of a sensor API response.
///
/// Fails with [`ParseError::MissingField`] if a requested column is absent.
/// Sensors without a location or without all five PM windows are skipped.
pub fn parse_api(data: &str) -> ParseResult<SensorCollection> {
    // ---
    let response: ApiResponse = serde_json::from_str(data)?;
    let columns = Columns::from_fields(&response.fields)?;

    let mut sensors = Vec::with_capacity(response.data.len());
    for (row_no, row) in response.data.iter().enumerate() {
        let decoded = ApiRow::decode(row, &columns, row_no)?;
        if let Some(reading) = decoded.into_reading(row_no)? {
            sensors.push(reading);
        }
    }

    debug!(
        rows = response.data.len(),
        kept = sensors.len(),
        "Parsed sensor API response"
    );
    Ok(sensors.into())
}

// ---

fn number(value: &Value, row_no: usize) -> ParseResult<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        other => Err(ParseError::malformed(format!(
            "row {} has non-numeric cell {}",
            row_no, other
        ))),
    }
}

/// A number where zero means "not reported".
fn nonzero_f64(value: &Value, row_no: usize) -> ParseResult<Option<f64>> {
    Ok(number(value, row_no)?.filter(|v| *v != 0.0))
}

/// A number where zero is a real reading.
fn optional_f64(value: &Value, row_no: usize) -> ParseResult<Option<f64>> {
    number(value, row_no)
}

fn optional_i64(value: &Value, row_no: usize) -> ParseResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_i64().map(Some).ok_or_else(|| {
            ParseError::malformed(format!("row {} has non-integer cell {}", row_no, n))
        }),
        other => Err(ParseError::malformed(format!(
            "row {} has non-numeric cell {}",
            row_no, other
        ))),
    }
}
