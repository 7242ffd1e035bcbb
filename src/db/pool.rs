use crate::{config::DatabaseConfig, errors::Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::time::Duration;

/// Reported as `application_name` so DBAs can tell our connections apart
const APPLICATION_NAME: &str = "helpdesk-gate";

/// Create the PostgreSQL pool shared by the credential and audit stores
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let options = config
        .url
        .parse::<PgConnectOptions>()?
        .application_name(APPLICATION_NAME);

    tracing::info!(application = APPLICATION_NAME, "Connecting to PostgreSQL");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .connect_with(options)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Apply the embedded schema migrations (users, audit_logs, append-only trigger)
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./src/db/migrations").run(pool).await?;
    Ok(())
}

/// Readiness check: a round trip through the pool
pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}
