pub mod middleware;

pub use middleware::{check_role, require_admin, require_super_admin, RoleDecision};
