//! `/sensors` endpoints: fetch the configured feed, normalize it, store a
//! snapshot and return the collection.

use anyhow::{anyhow, Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, error, info};
use uuid::Uuid;

use sensorflow_aqi::feeds::{self, FeedSource};
use sensorflow_aqi::{SensorCollection, SensorReading};

use crate::Config;

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/sensors", get(sensors_handler))
        .route("/sensors/compact", get(compact_handler))
}

async fn sensors_handler(State((pool, config)): State<(PgPool, Config)>) -> Response {
    // ---
    match run_pipeline(&pool, &config, "/sensors").await {
        Ok(sensors) => (StatusCode::OK, Json(sensors)).into_response(),
        Err(response) => response,
    }
}

/// Same pipeline as `/sensors`, reduced to location and 10-minute AQI.
async fn compact_handler(State((pool, config)): State<(PgPool, Config)>) -> Response {
    // ---
    match run_pipeline(&pool, &config, "/sensors/compact").await {
        Ok(sensors) => (StatusCode::OK, Json(sensors.compact())).into_response(),
        Err(response) => response,
    }
}

async fn run_pipeline(
    pool: &PgPool,
    config: &Config,
    route: &str,
) -> Result<SensorCollection, Response> {
    // ---
    info!("GET {} - Starting pipeline ({} feed)", route, config.source);

    // Step 1: Fetch the raw feed
    debug!("GET {} - Step 1", route);

    let body = match fetch_feed(config).await {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to fetch {} feed: {:#}", config.source, e);
            return Err(
                (StatusCode::BAD_GATEWAY, Json("Failed to fetch sensor feed")).into_response(),
            );
        }
    };

    // Step 2: Normalize
    debug!("GET {} - Step 2", route);

    let sensors = match config.source.parse(&body) {
        Ok(sensors) => sensors,
        Err(e) => {
            error!("Failed to parse {} feed: {}", config.source, e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to parse sensor feed"),
            )
                .into_response());
        }
    };

    // Step 3: Store snapshot; readings are still served if this fails
    debug!("GET {} - Step 3", route);

    match store_snapshot(pool, config.source, &sensors).await {
        Ok(snapshot_id) => debug!("Stored snapshot {} ({} sensors)", snapshot_id, sensors.len()),
        Err(e) => error!("Failed to store snapshot: {}", e),
    }

    info!("Pipeline complete, returning {} sensors", sensors.len());
    Ok(sensors)
}

// ---

/// Download the configured feed and return the response body.
async fn fetch_feed(config: &Config) -> Result<String> {
    // ---
    let url = match config.source {
        FeedSource::Api => {
            let key = config
                .api_key
                .as_deref()
                .ok_or_else(|| anyhow!("No API key configured for the sensor API"))?;
            feeds::api_url(&config.api_url, key)?
        }
        FeedSource::Legacy => reqwest::Url::parse(&config.json_url)
            .with_context(|| format!("Invalid legacy feed URL '{}'", config.json_url))?,
    };

    // Query string carries the API key; log the endpoint only.
    debug!(
        "Fetching {} feed from {}{}",
        config.source,
        url.origin().ascii_serialization(),
        url.path()
    );

    let client = reqwest::Client::new();
    let response = client.get(url).send().await?.error_for_status()?;
    let body = response.text().await?;

    debug!("Fetched {} bytes", body.len());
    Ok(body)
}

/// Store one refresh under a fresh snapshot id, in a single transaction.
async fn store_snapshot(
    pool: &PgPool,
    source: FeedSource,
    sensors: &SensorCollection,
) -> Result<Uuid, sqlx::Error> {
    // ---
    let snapshot_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO sensor_snapshots (snapshot_id, source, fetched_at, sensor_count)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(snapshot_id)
    .bind(source.as_str())
    .bind(Utc::now())
    .bind(sensors.len() as i32)
    .execute(&mut *tx)
    .await?;

    for reading in &sensors.sensors {
        store_sensor_reading(&mut tx, snapshot_id, reading).await?;
    }

    tx.commit().await?;
    Ok(snapshot_id)
}

async fn store_sensor_reading(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    snapshot_id: Uuid,
    reading: &SensorReading,
) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO sensor_readings (
            snapshot_id, sensor_id, latitude, longitude,
            aqi_10m, aqi_30m, aqi_1h, aqi_6h, aqi_24h, last_updated
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (snapshot_id, sensor_id) DO NOTHING
        "#,
    )
    .bind(snapshot_id)
    .bind(reading.id)
    .bind(reading.latitude)
    .bind(reading.longitude)
    .bind(reading.aqi_10m)
    .bind(reading.aqi_30m)
    .bind(reading.aqi_1h)
    .bind(reading.aqi_6h)
    .bind(reading.aqi_24h)
    .bind(reading.last_updated)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
