// Session storage in Redis, shared across instances

use crate::auth::session::{SessionId, SessionStore};
use crate::domain::SessionSnapshot;
use crate::errors::Result;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;

const SESSION_PREFIX: &str = "session:";

/// Snapshots stored as JSON under `session:{id}`, expiring with the
/// session TTL
pub struct RedisSessionStore {
    manager: ConnectionManager,
    ttl: Duration,
}

impl RedisSessionStore {
    pub fn new(manager: ConnectionManager, ttl: Duration) -> Self {
        Self { manager, ttl }
    }

    fn key(id: &SessionId) -> String {
        format!("{}{}", SESSION_PREFIX, id.as_str())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, snapshot: &SessionSnapshot) -> Result<SessionId> {
        let id = SessionId::generate();
        let payload = serde_json::to_string(snapshot)?;
        let mut manager = self.manager.clone();

        redis::cmd("SET")
            .arg(Self::key(&id))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl.as_secs())
            .query_async::<_, ()>(&mut manager)
            .await?;

        Ok(id)
    }

    async fn load(&self, id: &SessionId) -> Result<Option<SessionSnapshot>> {
        let mut manager = self.manager.clone();
        let payload: Option<String> = manager.get(Self::key(id)).await?;

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn replace(&self, id: &SessionId, snapshot: &SessionSnapshot) -> Result<()> {
        let payload = serde_json::to_string(snapshot)?;
        let mut manager = self.manager.clone();

        // XX: never recreate a session that expired meanwhile
        redis::cmd("SET")
            .arg(Self::key(id))
            .arg(payload)
            .arg("XX")
            .arg("KEEPTTL")
            .query_async::<_, ()>(&mut manager)
            .await?;

        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<()> {
        let mut manager = self.manager.clone();
        manager.del::<_, ()>(Self::key(id)).await?;
        tracing::debug!(session = ?id, "Session removed from Redis");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    // Requires a running Redis instance
    #[tokio::test]
    #[ignore]
    async fn test_redis_session_lifecycle() {
        let config = crate::config::RedisConfig {
            url: "redis://localhost:6379".to_string(),
        };
        let manager = crate::redis::create_client(&config).await.unwrap();
        let store = RedisSessionStore::new(manager, Duration::from_secs(60));

        let snapshot = SessionSnapshot {
            id: 1,
            username: "superadmin".to_string(),
            email: "superadmin@hospital.example".to_string(),
            role: Role::SuperAdmin,
        };
        let id = store.create(&snapshot).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), Some(snapshot.clone()));

        let demoted = SessionSnapshot {
            role: Role::Admin,
            ..snapshot
        };
        store.replace(&id, &demoted).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), Some(demoted));

        store.destroy(&id).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), None);
    }
}
