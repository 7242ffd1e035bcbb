// Database row types and their mapping onto domain types

use crate::domain::{AuditLogEntry, User, UserCredentials};
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub login_attempts: i32,
    pub last_login: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = row
            .role
            .parse()
            .map_err(|_| AppError::CorruptRecord(format!("user {} has role {:?}", row.id, row.role)))?;
        let status = row
            .status
            .parse()
            .map_err(|_| AppError::CorruptRecord(format!("user {} has status {:?}", row.id, row.status)))?;

        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            role,
            status,
            login_attempts: row.login_attempts,
            last_login: row.last_login,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserCredentialsRow {
    #[sqlx(flatten)]
    pub user: UserRow,
    pub password_hash: String,
}

impl TryFrom<UserCredentialsRow> for UserCredentials {
    type Error = AppError;

    fn try_from(row: UserCredentialsRow) -> Result<Self> {
        Ok(UserCredentials {
            user: row.user.try_into()?,
            password_hash: row.password_hash,
        })
    }
}

// ============================================================================
// Audit Log
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct AuditLogRow {
    pub id: i64,
    pub actor_id: Option<i64>,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<i64>,
    pub details: String,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub previous_hash: Option<String>,
    pub entry_hash: String,
}

impl From<AuditLogRow> for AuditLogEntry {
    fn from(row: AuditLogRow) -> Self {
        AuditLogEntry {
            id: row.id,
            actor_id: row.actor_id,
            action: row.action,
            target_type: row.target_type,
            target_id: row.target_id,
            details: row.details,
            ip_address: row.ip_address,
            created_at: row.created_at,
            previous_hash: row.previous_hash,
            entry_hash: row.entry_hash,
        }
    }
}
