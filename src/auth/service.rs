use crate::auth::password::{Argon2Hasher, CredentialVerifier};
use crate::crypto::random_token;
use crate::db::UserStore;
use crate::domain::{SessionSnapshot, User};
use crate::errors::{AppError, Result};
use crate::observability::MetricsRecorder;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Credential checks for the login form.
///
/// Every failure path returns the same `Ok(None)`, and the hash comparison
/// runs whether or not the username exists.
pub struct Authenticator {
    users: Arc<dyn UserStore>,
    verifier: Arc<dyn CredentialVerifier>,
    dummy_hash: String,
    max_login_attempts: i32,
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn UserStore>,
        verifier: Arc<dyn CredentialVerifier>,
        dummy_hash: String,
        max_login_attempts: i32,
    ) -> Self {
        Self {
            users,
            verifier,
            dummy_hash,
            max_login_attempts,
        }
    }

    /// Authenticator backed by Argon2id. The dummy hash uses the same
    /// parameters as real credentials so both paths cost the same.
    pub fn with_argon2(
        users: Arc<dyn UserStore>,
        hasher: Argon2Hasher,
        max_login_attempts: i32,
    ) -> Result<Self> {
        let dummy_hash = hasher.hash(&random_token(16))?;
        Ok(Self::new(users, Arc::new(hasher), dummy_hash, max_login_attempts))
    }

    /// Check a username/password pair.
    ///
    /// `Ok(None)` covers unknown users, wrong passwords, locked accounts and
    /// inactive accounts alike. `Err` is reserved for infrastructure faults.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let Some(credentials) = self.users.find_by_username_with_password(username).await? else {
            self.verify(password, &self.dummy_hash).await?;
            debug!("Login rejected: unknown username");
            MetricsRecorder::record_login("unknown_user");
            return Ok(None);
        };

        let password_ok = self.verify(password, &credentials.password_hash).await?;
        let user = credentials.user;

        if user.login_attempts >= self.max_login_attempts {
            warn!(user_id = user.id, attempts = user.login_attempts, "Login rejected: account locked");
            MetricsRecorder::record_login("locked");
            return Ok(None);
        }

        if !password_ok {
            self.users.increment_login_attempts(&user.username).await?;
            warn!(
                user_id = user.id,
                attempts = user.login_attempts + 1,
                "Login rejected: wrong password"
            );
            MetricsRecorder::record_login("wrong_password");
            return Ok(None);
        }

        if !user.is_active() {
            warn!(user_id = user.id, status = %user.status, "Login rejected: account not active");
            MetricsRecorder::record_login("inactive");
            return Ok(None);
        }

        let last_login = self.users.update_last_login(user.id).await?;
        info!(user_id = user.id, role = %user.role, "User authenticated");
        MetricsRecorder::record_login("success");

        Ok(Some(User {
            login_attempts: 0,
            last_login: Some(last_login),
            ..user
        }))
    }

    /// Run the hash comparison on the blocking pool. An unreadable stored
    /// hash counts as a mismatch.
    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let verifier = Arc::clone(&self.verifier);
        let password = password.to_owned();
        let hash = hash.to_owned();

        let outcome = tokio::task::spawn_blocking(move || verifier.verify(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?;

        match outcome {
            Ok(matched) => Ok(matched),
            Err(e) => {
                warn!(error = %e, "Stored password hash could not be checked");
                Ok(false)
            }
        }
    }
}

/// The identity projection persisted in the session
pub fn create_session_data(user: &User) -> SessionSnapshot {
    SessionSnapshot::from(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::testing::RecordingVerifier;
    use crate::db::users::memory::InMemoryUserStore;
    use crate::domain::{Role, UserStatus};
    use chrono::Utc;

    const PASSWORD: &str = "Radiology!2024";

    struct Fixture {
        users: Arc<InMemoryUserStore>,
        verifier: Arc<RecordingVerifier>,
        dummy_hash: String,
        stored_hash: String,
        authenticator: Authenticator,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(InMemoryUserStore::new());
        let verifier = Arc::new(RecordingVerifier::new());
        let dummy_hash = verifier.hash("dummy-password");
        let stored_hash = verifier.hash(PASSWORD);

        users.insert(
            User {
                id: 1,
                username: "radiology".to_string(),
                email: "radiology@hospital.example".to_string(),
                role: Role::Department,
                status: UserStatus::Active,
                login_attempts: 0,
                last_login: None,
            },
            &stored_hash,
        );

        let authenticator = Authenticator::new(users.clone(), verifier.clone(), dummy_hash.clone(), 5);

        Fixture {
            users,
            verifier,
            dummy_hash,
            stored_hash,
            authenticator,
        }
    }

    #[tokio::test]
    async fn test_successful_login_resets_bookkeeping() {
        let f = fixture();
        f.users.set_login_attempts(1, 3);
        let before = Utc::now();

        let user = f.authenticator.authenticate("radiology", PASSWORD).await.unwrap().unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(user.login_attempts, 0);
        assert!(user.last_login.unwrap() >= before);

        let stored = f.users.get(1).unwrap();
        assert_eq!(stored.login_attempts, 0);
        assert_eq!(stored.last_login, user.last_login);
    }

    #[tokio::test]
    async fn test_unknown_user_still_runs_hash_comparison() {
        let f = fixture();

        let result = f.authenticator.authenticate("ghost", "whatever").await.unwrap();

        assert!(result.is_none());
        assert_eq!(f.verifier.seen(), vec![f.dummy_hash.clone()]);
        assert_eq!(f.users.writes(), 0);
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_look_alike() {
        let f = fixture();

        let unknown = f.authenticator.authenticate("ghost", "wrong").await.unwrap();
        let wrong = f.authenticator.authenticate("radiology", "wrong").await.unwrap();

        assert_eq!(unknown, wrong);
        assert_eq!(f.verifier.seen(), vec![f.dummy_hash.clone(), f.stored_hash.clone()]);
    }

    #[tokio::test]
    async fn test_wrong_password_increments_counter() {
        let f = fixture();

        assert!(f.authenticator.authenticate("radiology", "nope").await.unwrap().is_none());
        assert!(f.authenticator.authenticate("radiology", "nope").await.unwrap().is_none());

        assert_eq!(f.users.get(1).unwrap().login_attempts, 2);
    }

    #[tokio::test]
    async fn test_lockout_after_five_failures() {
        let f = fixture();

        for _ in 0..5 {
            assert!(f.authenticator.authenticate("radiology", "nope").await.unwrap().is_none());
        }
        assert_eq!(f.users.get(1).unwrap().login_attempts, 5);
        let writes = f.users.writes();

        let result = f.authenticator.authenticate("radiology", PASSWORD).await.unwrap();

        assert!(result.is_none(), "correct password must not unlock the account");
        assert_eq!(f.users.writes(), writes, "locked accounts are not mutated");
        let stored = f.users.get(1).unwrap();
        assert_eq!(stored.login_attempts, 5);
        assert_eq!(stored.last_login, None);
        assert_eq!(f.verifier.seen().last(), Some(&f.stored_hash), "hash still compared");
    }

    #[tokio::test]
    async fn test_wrong_password_on_locked_account_does_not_increment() {
        let f = fixture();
        f.users.set_login_attempts(1, 7);

        assert!(f.authenticator.authenticate("radiology", "nope").await.unwrap().is_none());
        assert_eq!(f.users.get(1).unwrap().login_attempts, 7);
    }

    #[tokio::test]
    async fn test_inactive_and_deleted_users_rejected() {
        for status in [UserStatus::Inactive, UserStatus::Deleted] {
            let f = fixture();
            f.users.set_status(1, status);

            let result = f.authenticator.authenticate("radiology", PASSWORD).await.unwrap();

            assert!(result.is_none());
            assert_eq!(f.users.writes(), 0);
            assert_eq!(f.users.get(1).unwrap().last_login, None);
        }
    }

    #[tokio::test]
    async fn test_usernames_are_case_sensitive() {
        let f = fixture();
        assert!(f.authenticator.authenticate("Radiology", PASSWORD).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let f = fixture();
        f.users.set_failing(true);

        let result = f.authenticator.authenticate("radiology", PASSWORD).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_unreadable_stored_hash_counts_as_mismatch() {
        let f = fixture();
        f.users.insert(
            User {
                id: 2,
                username: "legacy".to_string(),
                email: "legacy@hospital.example".to_string(),
                role: Role::Department,
                status: UserStatus::Active,
                login_attempts: 0,
                last_login: None,
            },
            "md5:0123456789abcdef",
        );

        assert!(f.authenticator.authenticate("legacy", "anything").await.unwrap().is_none());
        assert_eq!(f.users.get(2).unwrap().login_attempts, 1);
    }

    #[tokio::test]
    async fn test_with_argon2_builds_working_authenticator() {
        let users = Arc::new(InMemoryUserStore::new());
        let hasher = crate::auth::password::testing::fast_hasher();
        users.insert(
            User {
                id: 9,
                username: "itadmin".to_string(),
                email: "itadmin@hospital.example".to_string(),
                role: Role::Admin,
                status: UserStatus::Active,
                login_attempts: 0,
                last_login: None,
            },
            &hasher.hash(PASSWORD).unwrap(),
        );

        let authenticator = Authenticator::with_argon2(users, hasher, 5).unwrap();
        assert!(authenticator.authenticate("itadmin", PASSWORD).await.unwrap().is_some());
        assert!(authenticator.authenticate("nobody", PASSWORD).await.unwrap().is_none());
    }

    #[test]
    fn test_session_data_is_minimal() {
        let user = User {
            id: 4,
            username: "itadmin".to_string(),
            email: "itadmin@hospital.example".to_string(),
            role: Role::Admin,
            status: UserStatus::Active,
            login_attempts: 2,
            last_login: Some(Utc::now()),
        };

        let value = serde_json::to_value(create_session_data(&user)).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();

        assert_eq!(keys, vec!["email", "id", "role", "username"]);
        assert_eq!(value["role"], "admin");
    }
}
