use anyhow::Context;
use helpdesk_gate::{
    api::{create_router, AppState},
    audit::{AuditRecorder, PostgresAuditStore},
    auth::{Argon2Hasher, Authenticator, HashParams, MemorySessionStore, SessionStore},
    config::{Backend, Config},
    db::{create_pool, run_migrations, seed_from_file, PgUserStore, UserStore},
    observability::{init_tracing, HealthChecker},
    rate_limit::{FixedWindowLimiter, MemoryWindowStore, WindowStore},
    redis::{create_client, RedisSessionStore, RedisWindowStore},
};
use redis::aio::ConnectionManager;
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    // Initialize tracing/logging
    init_tracing(&config.observability);

    tracing::info!("Starting helpdesk gate");
    tracing::info!("Configuration loaded: {:?}", config.server);

    // Create database connection pool
    let db_pool = create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    // Run database migrations
    run_migrations(&db_pool).await?;
    tracing::info!("Database migrations completed");

    let redis_manager = if config.uses_redis() {
        let manager = create_client(&config.redis).await?;
        tracing::info!("Redis connection established");
        Some(manager)
    } else {
        None
    };

    let hasher = Argon2Hasher::new(HashParams::from(&config.auth))?;
    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(db_pool.clone()));
    let audit = AuditRecorder::new(Arc::new(PostgresAuditStore::new(db_pool.clone())), &config.audit);

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None => {}
        Some("seed") => {
            let path: PathBuf = args
                .next()
                .context("usage: helpdesk-gate seed <users.toml>")?
                .into();
            let summary = seed_from_file(&path, users.as_ref(), &hasher, &audit).await?;
            tracing::info!(
                created = summary.created,
                skipped = summary.skipped,
                "Seeding finished"
            );
            return Ok(());
        }
        Some(other) => anyhow::bail!("Unknown command: {}", other),
    }

    let session_ttl = Duration::from_secs(config.session.ttl_seconds);
    let sessions: Arc<dyn SessionStore> = match config.session.backend {
        Backend::Memory => Arc::new(MemorySessionStore::new(session_ttl)),
        Backend::Redis => Arc::new(RedisSessionStore::new(
            require_redis(&redis_manager)?,
            session_ttl,
        )),
    };

    let window_store: Arc<dyn WindowStore> = match config.rate_limit.backend {
        Backend::Memory => Arc::new(MemoryWindowStore::new()),
        Backend::Redis => Arc::new(RedisWindowStore::new(require_redis(&redis_manager)?)),
    };

    let state = AppState {
        authenticator: Arc::new(Authenticator::with_argon2(
            users.clone(),
            hasher,
            config.auth.max_login_attempts,
        )?),
        users,
        sessions,
        audit,
        login_limiter: Arc::new(FixedWindowLimiter::login(window_store, &config.rate_limit)),
        health_checker: Arc::new(HealthChecker::new(db_pool.clone(), redis_manager.clone())),
        session_config: Arc::new(config.session.clone()),
        trust_proxy: config.server.trust_proxy,
    };

    // Create router
    let app = create_router(state);

    // Bind server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Helpdesk gate is ready to accept requests");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

fn require_redis(manager: &Option<ConnectionManager>) -> anyhow::Result<ConnectionManager> {
    manager
        .clone()
        .context("Redis backend selected but no Redis connection was created")
}
