use crate::audit::tamper_proof::{HashChain, HashableEntry};
use crate::db::schema::AuditLogRow;
use crate::domain::{AuditLogEntry, NewAuditEntry};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sqlx::PgPool;
use tracing::error;

/// Advisory lock key serializing appends so the hash chain stays linear
const AUDIT_CHAIN_LOCK: i64 = 0x4155_4449_545f_4c4f;

const AUDIT_COLUMNS: &str = "id, actor_id, action, target_type, target_id, details, \
                             ip_address, created_at, previous_hash, entry_hash";

/// Storage contract for the append-only audit log
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append an entry, linking it to the current chain head
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry>;

    /// Entries about one target, newest first
    async fn find_by_target(
        &self,
        target_type: &str,
        target_id: i64,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>>;

    /// Entries by one actor, newest first
    async fn find_by_actor(&self, actor_id: i64, limit: i64) -> Result<Vec<AuditLogEntry>>;

    /// Entries with `id > after_id` in ascending order, for chain verification
    async fn chain_page(&self, after_id: i64, limit: i64) -> Result<Vec<AuditLogEntry>>;
}

/// PostgreSQL storage backend for audit logs
pub struct PostgresAuditStore {
    pool: PgPool,
}

impl PostgresAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PostgresAuditStore {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(AUDIT_CHAIN_LOCK)
            .execute(&mut *tx)
            .await?;

        let previous_hash: Option<String> =
            sqlx::query_scalar("SELECT entry_hash FROM audit_logs ORDER BY id DESC LIMIT 1")
                .fetch_optional(&mut *tx)
                .await?;

        let created_at = Utc::now().trunc_subsecs(6);
        let entry_hash = HashChain::new().compute_hash(&HashableEntry::pending(
            &entry,
            created_at,
            previous_hash.as_deref(),
        ));

        let row = sqlx::query_as::<_, AuditLogRow>(&format!(
            r#"
            INSERT INTO audit_logs (
                actor_id, action, target_type, target_id, details,
                ip_address, created_at, previous_hash, entry_hash
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {AUDIT_COLUMNS}
            "#
        ))
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.target_type)
        .bind(entry.target_id)
        .bind(&entry.details)
        .bind(&entry.ip_address)
        .bind(created_at)
        .bind(&previous_hash)
        .bind(&entry_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to insert audit log: {:?}", e);
            AppError::Database(e)
        })?;

        tx.commit().await?;

        Ok(row.into())
    }

    async fn find_by_target(
        &self,
        target_type: &str,
        target_id: i64,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(&format!(
            r#"
            SELECT {AUDIT_COLUMNS}
            FROM audit_logs
            WHERE target_type = $1 AND target_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#
        ))
        .bind(target_type)
        .bind(target_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }

    async fn find_by_actor(&self, actor_id: i64, limit: i64) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(&format!(
            r#"
            SELECT {AUDIT_COLUMNS}
            FROM audit_logs
            WHERE actor_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(actor_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }

    async fn chain_page(&self, after_id: i64, limit: i64) -> Result<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE id > $1 ORDER BY id ASC LIMIT $2"
        ))
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }
}

/// In-memory storage backend (for testing)
#[cfg(test)]
pub mod memory {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    pub struct InMemoryAuditStore {
        entries: tokio::sync::Mutex<Vec<AuditLogEntry>>,
        failing: AtomicBool,
    }

    impl InMemoryAuditStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn entries(&self) -> Vec<AuditLogEntry> {
            self.entries.lock().await.clone()
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(())
        }
    }

    fn newest_first(mut entries: Vec<AuditLogEntry>, limit: i64) -> Vec<AuditLogEntry> {
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        entries.truncate(limit.max(0) as usize);
        entries
    }

    #[async_trait]
    impl AuditStore for InMemoryAuditStore {
        async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry> {
            self.check()?;
            let mut entries = self.entries.lock().await;
            let previous_hash = entries.last().map(|e| e.entry_hash.clone());
            let created_at = Utc::now().trunc_subsecs(6);
            let entry_hash = HashChain::new().compute_hash(&HashableEntry::pending(
                &entry,
                created_at,
                previous_hash.as_deref(),
            ));

            let persisted = AuditLogEntry {
                id: entries.len() as i64 + 1,
                actor_id: entry.actor_id,
                action: entry.action,
                target_type: entry.target_type,
                target_id: entry.target_id,
                details: entry.details,
                ip_address: entry.ip_address,
                created_at,
                previous_hash,
                entry_hash,
            };
            entries.push(persisted.clone());
            Ok(persisted)
        }

        async fn find_by_target(
            &self,
            target_type: &str,
            target_id: i64,
            limit: i64,
        ) -> Result<Vec<AuditLogEntry>> {
            self.check()?;
            let matching = self
                .entries
                .lock()
                .await
                .iter()
                .filter(|e| e.target_type == target_type && e.target_id == Some(target_id))
                .cloned()
                .collect();
            Ok(newest_first(matching, limit))
        }

        async fn find_by_actor(&self, actor_id: i64, limit: i64) -> Result<Vec<AuditLogEntry>> {
            self.check()?;
            let matching = self
                .entries
                .lock()
                .await
                .iter()
                .filter(|e| e.actor_id == Some(actor_id))
                .cloned()
                .collect();
            Ok(newest_first(matching, limit))
        }

        async fn chain_page(&self, after_id: i64, limit: i64) -> Result<Vec<AuditLogEntry>> {
            self.check()?;
            Ok(self
                .entries
                .lock()
                .await
                .iter()
                .filter(|e| e.id > after_id)
                .take(limit.max(0) as usize)
                .cloned()
                .collect())
        }
    }
}
