use crate::api::flash::{redirect_with_notice, Notice};
use crate::api::routes::{DASHBOARD_PATH, LOGIN_PATH};
use crate::auth::AuthSession;
use crate::domain::RoleRequirement;
use axum::{extract::Request, middleware::Next, response::Response};

/// Outcome of a role check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleDecision {
    Allowed,
    /// The session gate did not run or admitted nobody
    NotAuthenticated,
    Forbidden,
}

/// Check the session's role against a requirement. Pure; never touches a
/// store.
pub fn check_role(session: Option<&AuthSession>, requirement: RoleRequirement) -> RoleDecision {
    match session {
        None => RoleDecision::NotAuthenticated,
        Some(session) if session.user.role.satisfies(requirement) => RoleDecision::Allowed,
        Some(_) => RoleDecision::Forbidden,
    }
}

/// Admit `admin` and `super_admin`
pub async fn require_admin(request: Request, next: Next) -> Response {
    enforce(RoleRequirement::Admin, Notice::AdminRequired, request, next).await
}

/// Admit `super_admin` only
pub async fn require_super_admin(request: Request, next: Next) -> Response {
    enforce(RoleRequirement::SuperAdmin, Notice::SuperAdminRequired, request, next).await
}

async fn enforce(
    requirement: RoleRequirement,
    denied: Notice,
    request: Request,
    next: Next,
) -> Response {
    let session = request.extensions().get::<AuthSession>();

    match check_role(session, requirement) {
        RoleDecision::Allowed => next.run(request).await,
        RoleDecision::NotAuthenticated => redirect_with_notice(LOGIN_PATH, Notice::LoginRequired),
        RoleDecision::Forbidden => {
            if let Some(session) = session {
                tracing::warn!(
                    user_id = session.user.id,
                    role = %session.user.role,
                    required = ?requirement,
                    path = %request.uri().path(),
                    "Access denied: insufficient role"
                );
            }
            redirect_with_notice(DASHBOARD_PATH, denied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionId;
    use crate::domain::{Role, SessionSnapshot};

    fn session(role: Role) -> AuthSession {
        AuthSession {
            session_id: SessionId::generate(),
            user: SessionSnapshot {
                id: 1,
                username: "user".to_string(),
                email: "user@hospital.example".to_string(),
                role,
            },
        }
    }

    #[test]
    fn test_admin_gate() {
        assert_eq!(check_role(Some(&session(Role::Admin)), RoleRequirement::Admin), RoleDecision::Allowed);
        assert_eq!(
            check_role(Some(&session(Role::SuperAdmin)), RoleRequirement::Admin),
            RoleDecision::Allowed
        );
        assert_eq!(
            check_role(Some(&session(Role::Department)), RoleRequirement::Admin),
            RoleDecision::Forbidden
        );
    }

    #[test]
    fn test_super_admin_gate() {
        assert_eq!(
            check_role(Some(&session(Role::SuperAdmin)), RoleRequirement::SuperAdmin),
            RoleDecision::Allowed
        );
        assert_eq!(
            check_role(Some(&session(Role::Admin)), RoleRequirement::SuperAdmin),
            RoleDecision::Forbidden
        );
        assert_eq!(
            check_role(Some(&session(Role::Department)), RoleRequirement::SuperAdmin),
            RoleDecision::Forbidden
        );
    }

    #[test]
    fn test_missing_session() {
        assert_eq!(check_role(None, RoleRequirement::Admin), RoleDecision::NotAuthenticated);
        assert_eq!(check_role(None, RoleRequirement::SuperAdmin), RoleDecision::NotAuthenticated);
    }
}
