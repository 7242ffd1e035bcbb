// Administrative endpoints: audit queries and account maintenance

use crate::api::extract::ClientIp;
use crate::api::flash::{redirect_with_notice, Notice};
use crate::api::routes::{AppState, DASHBOARD_PATH};
use crate::audit::ChainReport;
use crate::auth::{csrf, AuthSession};
use crate::domain::{AuditAction, AuditLogEntry, AuditTarget, TargetType, User, UserStatus};
use crate::errors::Result;
use crate::rate_limit::UNKNOWN_CLIENT;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    Extension, Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::net::IpAddr;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "_csrf")]
    pub csrf: String,
}

#[derive(Debug, Deserialize)]
pub struct UnlockForm {
    #[serde(default, rename = "_csrf")]
    pub csrf: String,
}

#[derive(Debug, Deserialize)]
pub struct RateLimitResetForm {
    #[serde(default)]
    pub ip: String,
    #[serde(default, rename = "_csrf")]
    pub csrf: String,
}

/// GET /admin/audit/target/:target_type/:target_id
pub async fn audit_by_target(
    State(state): State<AppState>,
    Path((target_type, target_id)): Path<(TargetType, i64)>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<AuditLogEntry>>> {
    let entries = state
        .audit
        .find_by_target(target_type, target_id, query.limit)
        .await?;
    Ok(Json(entries))
}

/// GET /admin/audit/actor/:actor_id
pub async fn audit_by_actor(
    State(state): State<AppState>,
    Path(actor_id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<AuditLogEntry>>> {
    let entries = state.audit.find_by_actor(actor_id, query.limit).await?;
    Ok(Json(entries))
}

/// GET /admin/audit/verify
pub async fn verify_audit_chain(State(state): State<AppState>) -> Result<Json<ChainReport>> {
    Ok(Json(state.audit.verify_chain().await?))
}

/// POST /admin/users/:id/status
pub async fn update_user_status(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    ClientIp(ip): ClientIp,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<StatusForm>,
) -> Response {
    if csrf::verify(&headers, &form.csrf).is_err() {
        warn!(actor_id = session.user.id, "Status change rejected: CSRF token mismatch");
        return redirect_with_notice(DASHBOARD_PATH, Notice::RequestRejected);
    }

    let Ok(status) = form.status.parse::<UserStatus>() else {
        warn!(actor_id = session.user.id, status = %form.status, "Status change rejected: unknown status");
        return redirect_with_notice(DASHBOARD_PATH, Notice::ActionFailed);
    };

    if user_id == session.user.id {
        warn!(actor_id = session.user.id, "Status change rejected: own account");
        return redirect_with_notice(DASHBOARD_PATH, Notice::ActionFailed);
    }

    let Some(previous) = load_target(&state, user_id).await else {
        return redirect_with_notice(DASHBOARD_PATH, Notice::ActionFailed);
    };

    let updated = match state.users.update_status(user_id, status).await {
        Ok(user) => user,
        Err(e) => {
            error!(user_id, error = %e, "Failed to update user status");
            return redirect_with_notice(DASHBOARD_PATH, Notice::ActionFailed);
        }
    };

    info!(
        actor_id = session.user.id,
        user_id,
        from = %previous.status,
        to = %updated.status,
        "User status changed"
    );

    state
        .audit
        .record_best_effort(
            Some(session.user.id),
            AuditAction::UserStatusChanged.as_str(),
            AuditTarget::new(TargetType::User, user_id),
            &json!({
                "username": updated.username,
                "from": previous.status,
                "to": updated.status,
            }),
            ip.as_deref(),
        )
        .await;

    redirect_with_notice(DASHBOARD_PATH, Notice::StatusUpdated)
}

/// POST /admin/users/:id/unlock
///
/// Clears the failed-login counter; the only way out of a lockout other
/// than a successful login.
pub async fn unlock_user(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    ClientIp(ip): ClientIp,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<UnlockForm>,
) -> Response {
    if csrf::verify(&headers, &form.csrf).is_err() {
        warn!(actor_id = session.user.id, "Unlock rejected: CSRF token mismatch");
        return redirect_with_notice(DASHBOARD_PATH, Notice::RequestRejected);
    }

    let Some(previous) = load_target(&state, user_id).await else {
        return redirect_with_notice(DASHBOARD_PATH, Notice::ActionFailed);
    };

    match state.users.reset_login_attempts(user_id).await {
        Ok(true) => {}
        Ok(false) => return redirect_with_notice(DASHBOARD_PATH, Notice::ActionFailed),
        Err(e) => {
            error!(user_id, error = %e, "Failed to reset login attempts");
            return redirect_with_notice(DASHBOARD_PATH, Notice::ActionFailed);
        }
    }

    info!(actor_id = session.user.id, user_id, "User account unlocked");

    state
        .audit
        .record_best_effort(
            Some(session.user.id),
            AuditAction::UserUnlocked.as_str(),
            AuditTarget::new(TargetType::User, user_id),
            &json!({
                "username": previous.username,
                "previous_attempts": previous.login_attempts,
            }),
            ip.as_deref(),
        )
        .await;

    redirect_with_notice(DASHBOARD_PATH, Notice::AccountUnlocked)
}

/// POST /admin/rate-limit/reset
///
/// Clears the login window for one client address. `unknown` names the
/// bucket shared by requests without an address.
pub async fn reset_login_rate_limit(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    Form(form): Form<RateLimitResetForm>,
) -> Response {
    if csrf::verify(&headers, &form.csrf).is_err() {
        warn!(actor_id = session.user.id, "Rate limit reset rejected: CSRF token mismatch");
        return redirect_with_notice(DASHBOARD_PATH, Notice::RequestRejected);
    }

    let address = form.ip.trim();
    let identifier = if address == UNKNOWN_CLIENT {
        UNKNOWN_CLIENT.to_string()
    } else {
        match address.parse::<IpAddr>() {
            Ok(parsed) => parsed.to_string(),
            Err(_) => {
                warn!(actor_id = session.user.id, ip = %address, "Rate limit reset rejected: bad address");
                return redirect_with_notice(DASHBOARD_PATH, Notice::ActionFailed);
            }
        }
    };

    if let Err(e) = state.login_limiter.reset(&identifier).await {
        error!(ip = %identifier, error = %e, "Failed to reset login rate limit");
        return redirect_with_notice(DASHBOARD_PATH, Notice::ActionFailed);
    }

    info!(actor_id = session.user.id, ip = %identifier, "Login rate limit reset");

    state
        .audit
        .record_best_effort(
            Some(session.user.id),
            AuditAction::RateLimitReset.as_str(),
            AuditTarget::system(),
            &json!({
                "scope": state.login_limiter.scope(),
                "ip": identifier,
            }),
            ip.as_deref(),
        )
        .await;

    redirect_with_notice(DASHBOARD_PATH, Notice::RateLimitReset)
}

async fn load_target(state: &AppState, user_id: i64) -> Option<User> {
    match state.users.find_by_id(user_id).await {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            warn!(user_id, "Target user not found");
            None
        }
        Err(e) => {
            error!(user_id, error = %e, "Failed to load target user");
            None
        }
    }
}
