use crate::errors::{AppError, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub session: SessionConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub audit: AuditConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Take the client address from `X-Forwarded-For` (behind a reverse proxy)
    pub trust_proxy: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// Where session snapshots and rate-limit counters live
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub backend: Backend,
    pub ttl_seconds: u64,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub max_login_attempts: i32,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub backend: Backend,
    pub login_window_seconds: u64,
    pub login_max_attempts: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    pub default_limit: i64,
    pub max_limit: i64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, for local development
    Pretty,
    Compact,
    /// One object per line, for log shippers
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let environment = env::var("HELPDESK_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(
                config::File::with_name(&format!("config/{}", environment)).required(false),
            )
            // e.g., HELPDESK__SERVER__PORT=8080
            .add_source(
                config::Environment::with_prefix("HELPDESK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Configuration(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Configuration("Invalid port number".to_string()));
        }

        if self.database.url.is_empty() {
            return Err(AppError::Configuration(
                "Database URL is required".to_string(),
            ));
        }

        if self.uses_redis() && self.redis.url.is_empty() {
            return Err(AppError::Configuration(
                "Redis URL is required when a redis backend is selected".to_string(),
            ));
        }

        if self.session.cookie_name.is_empty() || self.session.ttl_seconds == 0 {
            return Err(AppError::Configuration(
                "Session cookie name and ttl are required".to_string(),
            ));
        }

        if self.auth.max_login_attempts < 1 {
            return Err(AppError::Configuration(
                "max_login_attempts must be at least 1".to_string(),
            ));
        }

        if self.rate_limit.login_window_seconds == 0 || self.rate_limit.login_max_attempts == 0 {
            return Err(AppError::Configuration(
                "Login rate limit window and limit must be positive".to_string(),
            ));
        }

        if tracing_subscriber::EnvFilter::try_new(&self.observability.log_level).is_err() {
            return Err(AppError::Configuration(format!(
                "Invalid log level directive: {}",
                self.observability.log_level
            )));
        }

        if self.audit.default_limit < 1 || self.audit.max_limit < self.audit.default_limit {
            return Err(AppError::Configuration(
                "Audit limits must satisfy 1 <= default_limit <= max_limit".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether any component needs a Redis connection
    pub fn uses_redis(&self) -> bool {
        self.session.backend == Backend::Redis || self.rate_limit.backend == Backend::Redis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = Config::load().expect("Failed to load config");
        assert!(config.validate().is_ok());

        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_login_policy() {
        let config = Config::load().expect("Failed to load config");
        assert_eq!(config.auth.max_login_attempts, 5);
        assert_eq!(config.rate_limit.login_window_seconds, 15 * 60);
        assert_eq!(config.rate_limit.login_max_attempts, 10);
        assert_eq!(config.audit.default_limit, 50);
    }

    #[test]
    fn test_bad_log_directive_rejected() {
        let mut config = Config::load().expect("Failed to load config");
        config.observability.log_level = "helpdesk_gate=loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_audit_limits_validated() {
        let mut config = Config::load().expect("Failed to load config");
        config.audit.max_limit = config.audit.default_limit - 1;
        assert!(config.validate().is_err());
    }
}
