pub mod csrf;
pub mod gate;
pub mod password;
pub mod service;
pub mod session;

pub use gate::{require_auth, AuthSession, GateOutcome};
pub use password::{Argon2Hasher, CredentialVerifier, HashParams};
pub use service::{create_session_data, Authenticator};
pub use session::{MemorySessionStore, SessionId, SessionStore};
