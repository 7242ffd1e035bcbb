use crate::{config::RedisConfig, errors::Result};
use redis::{aio::ConnectionManager, Client};

/// Connect to the Redis instance holding sessions and rate-limit counters.
///
/// The manager reconnects on its own; clones share one multiplexed
/// connection.
pub async fn create_client(config: &RedisConfig) -> Result<ConnectionManager> {
    let client = Client::open(config.url.as_str())?;
    tracing::info!(db = client.get_connection_info().redis.db, "Connecting to Redis");

    let manager = ConnectionManager::new(client).await?;

    tracing::info!("Redis client connected");

    Ok(manager)
}

/// Readiness check for the Redis connection
pub async fn health_check(manager: &mut ConnectionManager) -> Result<()> {
    let reply: String = redis::cmd("PING").query_async(manager).await?;
    if reply != "PONG" {
        return Err(crate::errors::AppError::Internal(format!(
            "Unexpected PING reply from Redis: {}",
            reply
        )));
    }
    Ok(())
}
