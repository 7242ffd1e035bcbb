// Fixed-window rate limiting counters backed by Redis

use crate::errors::Result;
use crate::rate_limit::{WindowHit, WindowStore};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Script};
use std::time::Duration;

const RATE_LIMIT_PREFIX: &str = "ratelimit:";

/// Counters shared by every instance that talks to the same Redis.
///
/// The first hit in a window sets the key's expiry; later hits only
/// increment, so the window never slides.
pub struct RedisWindowStore {
    manager: ConnectionManager,
    script: Script,
}

impl RedisWindowStore {
    pub fn new(manager: ConnectionManager) -> Self {
        Self {
            manager,
            script: Script::new(
                r#"
                local current = redis.call('INCR', KEYS[1])
                if current == 1 then
                    redis.call('PEXPIRE', KEYS[1], ARGV[1])
                end

                local ttl = redis.call('PTTL', KEYS[1])
                if ttl < 0 then
                    -- key lost its expiry; start a fresh window
                    redis.call('PEXPIRE', KEYS[1], ARGV[1])
                    ttl = tonumber(ARGV[1])
                end

                return {current, ttl}
                "#,
            ),
        }
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<WindowHit> {
        let redis_key = format!("{}{}", RATE_LIMIT_PREFIX, key);
        let mut manager = self.manager.clone();

        let (count, ttl_ms): (u64, u64) = self
            .script
            .key(&redis_key)
            .arg(window.as_millis() as u64)
            .invoke_async(&mut manager)
            .await?;

        Ok(WindowHit {
            count,
            resets_in: Duration::from_millis(ttl_ms),
        })
    }

    async fn reset(&self, key: &str) -> Result<()> {
        let redis_key = format!("{}{}", RATE_LIMIT_PREFIX, key);
        let mut manager = self.manager.clone();
        manager.del::<_, ()>(&redis_key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::FixedWindowLimiter;
    use std::sync::Arc;

    // Requires a running Redis instance
    #[tokio::test]
    #[ignore]
    async fn test_redis_fixed_window() {
        let config = crate::config::RedisConfig {
            url: "redis://localhost:6379".to_string(),
        };
        let manager = crate::redis::create_client(&config).await.unwrap();
        let store = Arc::new(RedisWindowStore::new(manager));
        let limiter = FixedWindowLimiter::new(store, "test_login", 3, Duration::from_secs(60));

        limiter.reset("192.0.2.10").await.unwrap();
        for _ in 0..3 {
            assert!(limiter.check("192.0.2.10").await.unwrap().allowed);
        }
        let result = limiter.check("192.0.2.10").await.unwrap();
        assert!(!result.allowed);
        assert!(result.reset_after <= 60);

        limiter.reset("192.0.2.10").await.unwrap();
    }
}
