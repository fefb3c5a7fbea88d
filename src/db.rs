use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.db.url)
        .await
        .with_context(|| "Failed to connect to PostgreSQL (check db.url)")?;

    Ok(pool)
}
