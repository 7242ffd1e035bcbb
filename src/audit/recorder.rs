use crate::audit::storage::AuditStore;
use crate::audit::tamper_proof::{ChainReport, ChainVerifier};
use crate::config::AuditConfig;
use crate::domain::{AuditLogEntry, AuditTarget, NewAuditEntry, TargetType};
use crate::errors::Result;
use crate::observability::MetricsRecorder;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Page size used when walking the whole chain
const VERIFY_PAGE_SIZE: i64 = 500;

/// Write and read paths of the audit trail.
///
/// The recorder serializes `details` and hands it to the store untouched; it
/// never interprets its shape.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    default_limit: i64,
    max_limit: i64,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>, config: &AuditConfig) -> Self {
        Self {
            store,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }

    /// Append an audit entry. Errors are returned to the caller, which
    /// decides whether the primary action should fail with it.
    ///
    /// `action` is a free-form code; `AuditAction` lists the ones this
    /// service emits.
    pub async fn record<D>(
        &self,
        actor_id: Option<i64>,
        action: &str,
        target: AuditTarget,
        details: &D,
        ip_address: Option<&str>,
    ) -> Result<AuditLogEntry>
    where
        D: Serialize + ?Sized,
    {
        let entry = NewAuditEntry {
            actor_id,
            action: action.to_string(),
            target_type: target.target_type.as_str().to_string(),
            target_id: target.target_id,
            details: serde_json::to_string(details)?,
            ip_address: ip_address.map(str::to_string),
        };

        let persisted = self.store.append(entry).await?;

        info!(
            audit_id = persisted.id,
            actor_id = ?persisted.actor_id,
            action = %persisted.action,
            target_type = %persisted.target_type,
            target_id = ?persisted.target_id,
            "Audit entry recorded"
        );

        Ok(persisted)
    }

    /// Append an audit entry, logging instead of failing
    pub async fn record_best_effort<D>(
        &self,
        actor_id: Option<i64>,
        action: &str,
        target: AuditTarget,
        details: &D,
        ip_address: Option<&str>,
    ) -> Option<AuditLogEntry>
    where
        D: Serialize + ?Sized,
    {
        match self.record(actor_id, action, target, details, ip_address).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                MetricsRecorder::record_audit_failure(action);
                warn!(
                    action,
                    target_type = target.target_type.as_str(),
                    target_id = ?target.target_id,
                    error = %e,
                    "Failed to record audit entry"
                );
                None
            }
        }
    }

    /// Entries about one target, newest first
    pub async fn find_by_target(
        &self,
        target_type: TargetType,
        target_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<AuditLogEntry>> {
        self.store
            .find_by_target(target_type.as_str(), target_id, self.effective_limit(limit))
            .await
    }

    /// Entries by one actor, newest first
    pub async fn find_by_actor(
        &self,
        actor_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<AuditLogEntry>> {
        self.store
            .find_by_actor(actor_id, self.effective_limit(limit))
            .await
    }

    /// Walk the whole chain from the first entry and report the first break
    pub async fn verify_chain(&self) -> Result<ChainReport> {
        let mut verifier = ChainVerifier::new();
        let mut after_id = 0;

        loop {
            let page = self.store.chain_page(after_id, VERIFY_PAGE_SIZE).await?;
            let Some(last) = page.last() else { break };
            after_id = last.id;

            if !page.iter().all(|entry| verifier.check(entry)) {
                break;
            }
            if (page.len() as i64) < VERIFY_PAGE_SIZE {
                break;
            }
        }

        let report = verifier.report();
        info!(
            entries_checked = report.entries_checked,
            intact = report.intact,
            "Audit chain verified"
        );
        Ok(report)
    }

    fn effective_limit(&self, limit: Option<i64>) -> i64 {
        limit.unwrap_or(self.default_limit).clamp(1, self.max_limit)
    }
}
