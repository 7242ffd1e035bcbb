use crate::config::RateLimitConfig;
use crate::errors::Result;
use crate::rate_limit::fixed_window::WindowStore;
use std::sync::Arc;
use std::time::Duration;

/// Key scope for the login limiter
pub const LOGIN_SCOPE: &str = "login";

/// Fixed-window rate limiter.
///
/// Every call counts, whether or not the guarded request later succeeds.
pub struct FixedWindowLimiter {
    store: Arc<dyn WindowStore>,
    scope: &'static str,
    limit: u64,
    window: Duration,
}

impl FixedWindowLimiter {
    pub fn new(store: Arc<dyn WindowStore>, scope: &'static str, limit: u64, window: Duration) -> Self {
        Self {
            store,
            scope,
            limit,
            window,
        }
    }

    /// Count a request from `identifier` and decide whether it may proceed
    pub async fn check(&self, identifier: &str) -> Result<RateLimitResult> {
        let key = format!("{}:{}", self.scope, identifier);
        let hit = self.store.hit(&key, self.window).await?;

        let result = RateLimitResult {
            allowed: hit.count <= self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(hit.count),
            current: hit.count,
            reset_after: ceil_secs(hit.resets_in),
            window: self.window.as_secs(),
        };

        tracing::debug!(
            key = %key,
            allowed = result.allowed,
            current = result.current,
            remaining = result.remaining,
            "Rate limit check result"
        );

        Ok(result)
    }

    /// Reset the counter for `identifier`
    pub async fn reset(&self, identifier: &str) -> Result<()> {
        let key = format!("{}:{}", self.scope, identifier);
        self.store.reset(&key).await?;
        tracing::info!(key = %key, "Rate limit reset");
        Ok(())
    }

    /// Login limiter with the configured window and attempt budget
    pub fn login(store: Arc<dyn WindowStore>, config: &RateLimitConfig) -> Self {
        Self::new(
            store,
            LOGIN_SCOPE,
            config.login_max_attempts,
            Duration::from_secs(config.login_window_seconds),
        )
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// The rate limit (max requests per window)
    pub limit: u64,
    /// Number of requests remaining in the current window
    pub remaining: u64,
    /// Current number of requests in the window
    pub current: u64,
    /// Seconds until the current window closes
    pub reset_after: u64,
    /// Window length in seconds
    pub window: u64,
}

impl RateLimitResult {
    /// Seconds the client should wait, only when rejected
    pub fn retry_after(&self) -> Option<u64> {
        if self.allowed {
            None
        } else {
            Some(self.reset_after)
        }
    }
}
