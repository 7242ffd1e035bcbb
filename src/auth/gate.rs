use crate::api::cookies::append_cookie;
use crate::api::flash::{redirect_with_notice, Notice};
use crate::api::routes::{AppState, LOGIN_PATH};
use crate::auth::session::{clear_session_cookie, session_id_from_headers, SessionId, SessionStore};
use crate::db::UserStore;
use crate::domain::SessionSnapshot;
use crate::errors::Result;
use crate::observability::MetricsRecorder;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, info, warn};

/// The authenticated user for the current request, as re-read from the
/// credential store
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: SessionId,
    pub user: SessionSnapshot,
}

/// Result of checking a request's session
#[derive(Debug)]
pub enum GateOutcome {
    /// No cookie, or the store does not know the id
    NoSession,
    /// The session outlived its user: gone, inactive or deleted
    Stale(SessionId),
    Valid(AuthSession),
}

/// Resolve a session id to a live user.
///
/// The stored snapshot is only trusted for the user id; everything else is
/// re-read so role and status changes apply on the next request.
pub async fn evaluate_session(
    sessions: &dyn SessionStore,
    users: &dyn UserStore,
    session_id: Option<SessionId>,
) -> Result<GateOutcome> {
    let Some(session_id) = session_id else {
        return Ok(GateOutcome::NoSession);
    };
    let Some(snapshot) = sessions.load(&session_id).await? else {
        return Ok(GateOutcome::NoSession);
    };

    let user = match users.find_by_id(snapshot.id).await? {
        Some(user) if user.is_active() => user,
        _ => return Ok(GateOutcome::Stale(session_id)),
    };

    let live = SessionSnapshot::from(&user);
    if live != snapshot {
        debug!(user_id = user.id, "Refreshing session snapshot");
        if let Err(e) = sessions.replace(&session_id, &live).await {
            warn!(user_id = user.id, error = %e, "Failed to refresh session snapshot");
        }
    }

    Ok(GateOutcome::Valid(AuthSession {
        session_id,
        user: live,
    }))
}

/// Middleware admitting only requests with a session whose user is still
/// active. Anything it cannot confirm is sent to the login page.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let session_id = session_id_from_headers(request.headers(), &state.session_config);

    match evaluate_session(state.sessions.as_ref(), state.users.as_ref(), session_id).await {
        Ok(GateOutcome::Valid(session)) => {
            MetricsRecorder::record_session_gate("valid");
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Ok(GateOutcome::NoSession) => {
            MetricsRecorder::record_session_gate("no_session");
            redirect_with_notice(LOGIN_PATH, Notice::LoginRequired)
        }
        Ok(GateOutcome::Stale(session_id)) => {
            MetricsRecorder::record_session_gate("stale");
            info!(session = ?session_id, "Destroying session of inactive or missing user");
            if let Err(e) = state.sessions.destroy(&session_id).await {
                warn!(error = %e, "Failed to destroy stale session");
            }

            let mut response = redirect_with_notice(LOGIN_PATH, Notice::SessionEnded);
            append_cookie(response.headers_mut(), clear_session_cookie(&state.session_config));
            response
        }
        Err(e) => {
            MetricsRecorder::record_session_gate("error");
            error!(error = %e, "Session check failed; denying request");
            redirect_with_notice(LOGIN_PATH, Notice::LoginRequired)
        }
    }
}
