use crate::api::cookies::{build_cookie, cookie_value, expired_cookie, CookieOptions};
use crate::config::SessionConfig;
use crate::crypto::random_token;
use crate::domain::SessionSnapshot;
use crate::errors::Result;
use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Random bytes behind a session id
const SESSION_ID_BYTES: usize = 32;

/// Expired sessions are swept once the store reaches this many entries, and
/// again each time it doubles in size after a sweep
const SWEEP_THRESHOLD: usize = 1_000;

/// Opaque session identifier carried in the session cookie
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(random_token(SESSION_ID_BYTES))
    }

    /// Accept only ids shaped like ones we issue
    pub fn parse(raw: &str) -> Option<Self> {
        let well_formed = raw.len() == SESSION_ID_BYTES * 2
            && raw.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        well_formed.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a prefix; the full id is a bearer credential
        write!(f, "SessionId({}..)", &self.0[..8.min(self.0.len())])
    }
}

/// Server-side session storage
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session and return its id
    async fn create(&self, snapshot: &SessionSnapshot) -> Result<SessionId>;

    /// Load a live session; expired or unknown ids yield `None`
    async fn load(&self, id: &SessionId) -> Result<Option<SessionSnapshot>>;

    /// Overwrite the payload of an existing session without extending it
    async fn replace(&self, id: &SessionId, snapshot: &SessionSnapshot) -> Result<()>;

    async fn destroy(&self, id: &SessionId) -> Result<()>;
}

/// Process-local session store
pub struct MemorySessionStore {
    sessions: Mutex<Sessions>,
    ttl: Duration,
}

#[derive(Default)]
struct Sessions {
    map: HashMap<SessionId, StoredSession>,
    next_sweep: usize,
}

impl Sessions {
    fn sweep_if_grown(&mut self, now: Instant) {
        if self.map.len() < self.next_sweep.max(SWEEP_THRESHOLD) {
            return;
        }
        self.map.retain(|_, s| s.expires_at > now);
        self.next_sweep = (self.map.len() * 2).max(SWEEP_THRESHOLD);
    }
}

struct StoredSession {
    snapshot: SessionSnapshot,
    expires_at: Instant,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(Sessions::default()),
            ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.map.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, snapshot: &SessionSnapshot) -> Result<SessionId> {
        let id = SessionId::generate();
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        sessions.sweep_if_grown(now);
        sessions.map.insert(
            id.clone(),
            StoredSession {
                snapshot: snapshot.clone(),
                expires_at: now + self.ttl,
            },
        );
        Ok(id)
    }

    async fn load(&self, id: &SessionId) -> Result<Option<SessionSnapshot>> {
        let mut sessions = self.sessions.lock().await;
        match sessions.map.get(id) {
            Some(stored) if stored.expires_at > Instant::now() => Ok(Some(stored.snapshot.clone())),
            Some(_) => {
                sessions.map.remove(id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn replace(&self, id: &SessionId, snapshot: &SessionSnapshot) -> Result<()> {
        if let Some(stored) = self.sessions.lock().await.map.get_mut(id) {
            stored.snapshot = snapshot.clone();
        }
        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<()> {
        self.sessions.lock().await.map.remove(id);
        Ok(())
    }
}

/// Session id presented by the browser, if well formed
pub fn session_id_from_headers(headers: &HeaderMap, config: &SessionConfig) -> Option<SessionId> {
    cookie_value(headers, &config.cookie_name).and_then(|raw| SessionId::parse(&raw))
}

pub fn session_cookie(config: &SessionConfig, id: &SessionId) -> Option<HeaderValue> {
    build_cookie(
        &config.cookie_name,
        id.as_str(),
        CookieOptions::lax(config.cookie_secure, Some(config.ttl_seconds)),
    )
}

pub fn clear_session_cookie(config: &SessionConfig) -> Option<HeaderValue> {
    expired_cookie(&config.cookie_name, config.cookie_secure)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;
    use crate::domain::Role;
    use axum::http::header;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            id: 7,
            username: "itadmin".to_string(),
            email: "itadmin@hospital.example".to_string(),
            role: Role::Admin,
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            backend: Backend::Memory,
            ttl_seconds: 3600,
            cookie_name: "helpdesk_session".to_string(),
            cookie_secure: true,
        }
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::generate();
        assert_eq!(SessionId::parse(id.as_str()), Some(id.clone()));
        assert_eq!(SessionId::parse("short"), None);
        assert_eq!(SessionId::parse(&"G".repeat(64)), None);
        assert_eq!(SessionId::parse(&id.as_str().to_uppercase()), None);
        assert!(!format!("{:?}", id).contains(id.as_str()));
    }

    #[tokio::test]
    async fn test_memory_store_lifecycle() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let id = store.create(&snapshot()).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), Some(snapshot()));

        let mut updated = snapshot();
        updated.role = Role::SuperAdmin;
        store.replace(&id, &updated).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), Some(updated));

        store.destroy(&id).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_expires_sessions() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let id = store.create(&snapshot()).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(store.load(&id).await.unwrap(), None);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_sessions_swept_once_store_grows() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        for _ in 0..SWEEP_THRESHOLD {
            store.create(&snapshot()).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(61)).await;

        store.create(&snapshot()).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_sessions_not_rescanned_on_every_login() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        for _ in 0..=SWEEP_THRESHOLD {
            store.create(&snapshot()).await.unwrap();
        }
        assert_eq!(store.sessions.lock().await.next_sweep, SWEEP_THRESHOLD * 2);

        // All expired, but the store has not doubled since the last sweep
        tokio::time::advance(Duration::from_secs(61)).await;
        store.create(&snapshot()).await.unwrap();
        assert_eq!(store.len().await, SWEEP_THRESHOLD + 2);
    }

    #[tokio::test]
    async fn test_replace_does_not_resurrect() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let id = SessionId::generate();
        store.replace(&id, &snapshot()).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), None);
    }

    #[test]
    fn test_cookie_helpers() {
        let config = config();
        let id = SessionId::generate();

        let cookie = session_cookie(&config, &id).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with(&format!("helpdesk_session={};", id.as_str())));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.contains("Secure"));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("helpdesk_session={}", id.as_str())).unwrap(),
        );
        assert_eq!(session_id_from_headers(&headers, &config), Some(id));

        let cleared = clear_session_cookie(&config).unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }
}
