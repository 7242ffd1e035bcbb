// Initial account provisioning from a TOML file

use crate::audit::AuditRecorder;
use crate::auth::Argon2Hasher;
use crate::db::UserStore;
use crate::domain::{AuditAction, AuditTarget, NewUser, Role, TargetType, UserStatus};
use crate::errors::{AppError, Result};
use crate::validation::{validate_email, validate_new_password, validate_username};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

/// Role and status stay strings here so every bad entry is reported at once
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .field("status", &self.status)
            .finish()
    }
}

/// A seed entry that passed validation
struct ValidatedUser<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    role: Role,
    status: UserStatus,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub created: usize,
    pub skipped: usize,
}

pub fn parse_seed(text: &str) -> Result<SeedFile> {
    toml::from_str(text).map_err(|e| AppError::ValidationError(format!("Invalid seed file: {}", e)))
}

/// Check every entry before anything is written
fn validate_seed(seed: &SeedFile) -> Result<Vec<ValidatedUser<'_>>> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();
    let mut validated = Vec::with_capacity(seed.users.len());

    for (idx, user) in seed.users.iter().enumerate() {
        let entry = idx + 1;
        let mut push = |message: String| problems.push(format!("users[{}]: {}", entry, message));

        if let Err(e) = validate_username(&user.username) {
            push(e.message.to_string());
        }
        if !seen.insert(user.username.as_str()) {
            push(format!("duplicate username '{}'", user.username));
        }
        if let Err(e) = validate_email(&user.email) {
            push(e.message.to_string());
        }
        if let Err(e) = validate_new_password(&user.password) {
            push(e.message.to_string());
        }
        let role = user.role.parse::<Role>().map_err(|e| push(e.to_string())).ok();
        let status = user
            .status
            .as_deref()
            .map_or(Ok(UserStatus::Active), str::parse::<UserStatus>)
            .map_err(|e| push(e.to_string()))
            .ok();

        if let (Some(role), Some(status)) = (role, status) {
            validated.push(ValidatedUser {
                username: &user.username,
                email: &user.email,
                password: &user.password,
                role,
                status,
            });
        }
    }

    if problems.is_empty() {
        Ok(validated)
    } else {
        Err(AppError::ValidationError(problems.join("; ")))
    }
}

/// Create the seed file's users. Existing usernames are left untouched.
pub async fn seed_users(
    seed: &SeedFile,
    users: &dyn UserStore,
    hasher: &Argon2Hasher,
    audit: &AuditRecorder,
) -> Result<SeedSummary> {
    let validated = validate_seed(seed)?;
    let mut summary = SeedSummary::default();

    for entry in validated {
        if users.find_by_username_with_password(entry.username).await?.is_some() {
            info!(username = entry.username, "Seed user already exists, skipping");
            summary.skipped += 1;
            continue;
        }

        let new_user = NewUser {
            username: entry.username.to_string(),
            email: entry.email.to_string(),
            password_hash: hasher.hash(entry.password)?,
            role: entry.role,
            status: entry.status,
        };

        let user = match users.create(new_user).await {
            Ok(user) => user,
            Err(AppError::UserAlreadyExists(username)) => {
                warn!(username = %username, "Seed user created concurrently, skipping");
                summary.skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        info!(user_id = user.id, username = %user.username, role = %user.role, "Seed user created");
        summary.created += 1;

        audit
            .record_best_effort(
                None,
                AuditAction::UserCreated.as_str(),
                AuditTarget::new(TargetType::User, user.id),
                &json!({
                    "username": user.username,
                    "role": user.role,
                    "status": user.status,
                    "source": "seed",
                }),
                None,
            )
            .await;
    }

    Ok(summary)
}

pub async fn seed_from_file(
    path: &Path,
    users: &dyn UserStore,
    hasher: &Argon2Hasher,
    audit: &AuditRecorder,
) -> Result<SeedSummary> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::Configuration(format!("Cannot read seed file {}: {}", path.display(), e))
    })?;
    seed_users(&parse_seed(&text)?, users, hasher, audit).await
}
