use crate::{
    api::{admin, auth, dashboard, health},
    audit::AuditRecorder,
    auth::{require_auth, Authenticator, SessionStore},
    authz::{require_admin, require_super_admin},
    config::SessionConfig,
    db::UserStore,
    observability::HealthChecker,
    rate_limit::{login_rate_limit, FixedWindowLimiter},
};
use axum::{
    extract::FromRef,
    handler::Handler,
    middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const LOGIN_PATH: &str = "/auth/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub authenticator: Arc<Authenticator>,
    pub audit: AuditRecorder,
    pub login_limiter: Arc<FixedWindowLimiter>,
    pub health_checker: Arc<HealthChecker>,
    pub session_config: Arc<SessionConfig>,
    pub trust_proxy: bool,
}

impl FromRef<AppState> for Arc<HealthChecker> {
    fn from_ref(state: &AppState) -> Self {
        state.health_checker.clone()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(health::metrics))
        .route("/", get(|| async { Redirect::to(DASHBOARD_PATH) }))
        .route(
            LOGIN_PATH,
            get(auth::login_page).post(
                auth::login.layer(middleware::from_fn_with_state(state.clone(), login_rate_limit)),
            ),
        )
        .route("/auth/logout", post(auth::logout))
        .merge(protected_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Routes behind the session gate; the role gates run after it
fn protected_routes(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route(
            "/admin/audit/target/:target_type/:target_id",
            get(admin::audit_by_target),
        )
        .route("/admin/audit/actor/:actor_id", get(admin::audit_by_actor))
        .route_layer(middleware::from_fn(require_admin));

    let super_admin = Router::new()
        .route("/admin/audit/verify", get(admin::verify_audit_chain))
        .route("/admin/users/:id/status", post(admin::update_user_status))
        .route("/admin/users/:id/unlock", post(admin::unlock_user))
        .route("/admin/rate-limit/reset", post(admin::reset_login_rate_limit))
        .route_layer(middleware::from_fn(require_super_admin));

    Router::new()
        .route(DASHBOARD_PATH, get(dashboard::show))
        .merge(admin)
        .merge(super_admin)
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
