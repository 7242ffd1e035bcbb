use redis::aio::ConnectionManager;
use serde::Serialize;
use sqlx::PgPool;

/// State of one dependency
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Ok,
    Error,
    /// Not configured for this deployment
    Disabled,
    /// Not checked (liveness only)
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub status: ComponentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl ComponentStatus {
    fn new(status: ComponentState) -> Self {
        Self {
            status,
            message: None,
        }
    }

    fn failed(message: &'static str) -> Self {
        Self {
            status: ComponentState::Error,
            message: Some(message),
        }
    }

    fn is_usable(&self) -> bool {
        matches!(self.status, ComponentState::Ok | ComponentState::Disabled)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub database: ComponentStatus,
    pub redis: ComponentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
}

impl HealthStatus {
    fn from_checks(checks: HealthChecks) -> Self {
        let ready = checks.database.is_usable() && checks.redis.is_usable();
        Self {
            status: if ready { "ok" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            checks,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ok"
    }
}

/// Checks the credential database and, when configured, Redis
pub struct HealthChecker {
    db_pool: PgPool,
    /// `None` when sessions and counters live in process
    redis_manager: Option<ConnectionManager>,
}

impl HealthChecker {
    pub fn new(db_pool: PgPool, redis_manager: Option<ConnectionManager>) -> Self {
        Self {
            db_pool,
            redis_manager,
        }
    }

    /// The process is up; dependencies are not consulted
    pub fn liveness(&self) -> HealthStatus {
        HealthStatus {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            checks: HealthChecks {
                database: ComponentStatus::new(ComponentState::Unknown),
                redis: ComponentStatus::new(ComponentState::Unknown),
            },
        }
    }

    /// Every configured dependency answers
    pub async fn readiness(&self) -> HealthStatus {
        let (database, redis) = tokio::join!(self.check_database(), self.check_redis());
        HealthStatus::from_checks(HealthChecks { database, redis })
    }

    async fn check_database(&self) -> ComponentStatus {
        match crate::db::health_check(&self.db_pool).await {
            Ok(()) => ComponentStatus::new(ComponentState::Ok),
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                ComponentStatus::failed("Database check failed")
            }
        }
    }

    async fn check_redis(&self) -> ComponentStatus {
        let Some(manager) = &self.redis_manager else {
            return ComponentStatus::new(ComponentState::Disabled);
        };

        let mut manager = manager.clone();
        match crate::redis::health_check(&mut manager).await {
            Ok(()) => ComponentStatus::new(ComponentState::Ok),
            Err(e) => {
                tracing::warn!(error = %e, "Redis health check failed");
                ComponentStatus::failed("Redis check failed")
            }
        }
    }
}
