//! End-to-end checks against a running service (`BASE_URL`, default
//! `http://localhost:8080`).

use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Sensors {
    sensors: Vec<Sensor>,
}

#[derive(Debug, Deserialize)]
struct Sensor {
    id: i64,
    latitude: f64,
    longitude: f64,
    aqi_10m: i32,
    aqi_30m: i32,
    aqi_1h: i32,
    aqi_6h: i32,
    aqi_24h: i32,
    last_updated: i64,
}

fn base_url() -> String {
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into())
}

#[test]
fn health_endpoint_ok() -> Result<()> {
    // ---
    let url = format!("{}/health", base_url());

    let body: serde_json::Value = tokio_test::block_on(async {
        Client::new().get(&url).send().await?.json().await
    })?;

    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn sensors_endpoint_returns_clean_records() -> Result<()> {
    // ---
    let url = format!("{}/sensors", base_url());

    let response: Sensors = Client::new().get(&url).send().await?.json().await?;

    assert!(!response.sensors.is_empty(), "No sensors returned from {}", url);

    for s in &response.sensors {
        // ---
        // Sensors without a location never reach the output
        assert!(s.latitude != 0.0, "sensor {} has zero latitude", s.id);
        assert!(s.longitude != 0.0, "sensor {} has zero longitude", s.id);

        for aqi in [s.aqi_10m, s.aqi_30m, s.aqi_1h, s.aqi_6h, s.aqi_24h] {
            assert!(aqi >= 0, "sensor {} has negative AQI {}", s.id, aqi);
        }
        assert!(s.last_updated > 0, "sensor {} has no last_updated", s.id);
    }

    Ok(())
}

#[tokio::test]
async fn compact_endpoint_keeps_location_and_10m_aqi_only() -> Result<()> {
    // ---
    let url = format!("{}/sensors/compact", base_url());

    let response: Sensors = Client::new().get(&url).send().await?.json().await?;

    for s in &response.sensors {
        assert!(s.latitude != 0.0 && s.longitude != 0.0);
        assert_eq!(
            (s.aqi_30m, s.aqi_1h, s.aqi_6h, s.aqi_24h, s.last_updated),
            (0, 0, 0, 0, 0),
            "compact sensor {} carries more than the 10-minute AQI",
            s.id
        );
    }

    Ok(())
}
