pub mod audit;
pub mod user;

pub use audit::{AuditAction, AuditLogEntry, AuditTarget, NewAuditEntry, TargetType};
pub use user::{NewUser, Role, RoleRequirement, SessionSnapshot, User, UserCredentials, UserStatus};
