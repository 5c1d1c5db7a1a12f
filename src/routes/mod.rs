use axum::Router;
use sqlx::PgPool;

use crate::Config;

mod health;
mod sensors;

// ---

pub fn router(pool: PgPool, config: Config) -> Router {
    // ---
    Router::new()
        .merge(sensors::router())
        .merge(health::router())
        .with_state((pool, config))
}
