//! Database schema management for `sensorflow-aqi`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates `sensor_snapshots` (one row per feed refresh) and
/// `sensor_readings` (one row per sensor per refresh). Safe to call on every
/// startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_snapshots (
            snapshot_id   UUID        PRIMARY KEY,
            source        TEXT        NOT NULL,
            fetched_at    TIMESTAMPTZ NOT NULL,
            sensor_count  INTEGER     NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Normalized readings served by `/sensors`
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_readings (
            snapshot_id   UUID             NOT NULL REFERENCES sensor_snapshots (snapshot_id),
            sensor_id     BIGINT           NOT NULL,
            latitude      DOUBLE PRECISION NOT NULL,
            longitude     DOUBLE PRECISION NOT NULL,
            aqi_10m       INTEGER          NOT NULL,
            aqi_30m       INTEGER          NOT NULL,
            aqi_1h        INTEGER          NOT NULL,
            aqi_6h        INTEGER          NOT NULL,
            aqi_24h       INTEGER          NOT NULL,
            last_updated  BIGINT           NOT NULL,
            PRIMARY KEY (snapshot_id, sensor_id)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_snapshots_fetched_at
            ON sensor_snapshots (fetched_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_readings_sensor_id
            ON sensor_readings (sensor_id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
