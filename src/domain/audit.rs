use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action codes written by the privileged handlers and the seeder.
///
/// Stored as free-form strings; these are the codes this service emits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    UserCreated,
    UserStatusChanged,
    UserUnlocked,
    RateLimitReset,
    FloorCreated,
    FloorUpdated,
    DepartmentCreated,
    DepartmentUpdated,
    TicketUpdated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserCreated => "USER_CREATED",
            AuditAction::UserStatusChanged => "USER_STATUS_CHANGED",
            AuditAction::UserUnlocked => "USER_UNLOCKED",
            AuditAction::RateLimitReset => "RATE_LIMIT_RESET",
            AuditAction::FloorCreated => "FLOOR_CREATED",
            AuditAction::FloorUpdated => "FLOOR_UPDATED",
            AuditAction::DepartmentCreated => "DEPARTMENT_CREATED",
            AuditAction::DepartmentUpdated => "DEPARTMENT_UPDATED",
            AuditAction::TicketUpdated => "TICKET_UPDATED",
        }
    }
}

/// Kind of entity an audit entry points at (soft polymorphic reference)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    User,
    Floor,
    Department,
    Ticket,
    System,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::User => "user",
            TargetType::Floor => "floor",
            TargetType::Department => "department",
            TargetType::Ticket => "ticket",
            TargetType::System => "system",
        }
    }
}

/// The entity affected by an audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditTarget {
    pub target_type: TargetType,
    pub target_id: Option<i64>,
}

impl AuditTarget {
    pub fn new(target_type: TargetType, target_id: i64) -> Self {
        Self {
            target_type,
            target_id: Some(target_id),
        }
    }

    pub fn system() -> Self {
        Self {
            target_type: TargetType::System,
            target_id: None,
        }
    }
}

/// An entry about to be appended. `details` is already serialized JSON text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAuditEntry {
    pub actor_id: Option<i64>,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<i64>,
    pub details: String,
    pub ip_address: Option<String>,
}

/// A persisted, immutable audit log entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
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

impl AuditLogEntry {
    /// Parse the stored details back into a JSON value
    pub fn details_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.details).unwrap_or(serde_json::Value::Null)
    }
}
