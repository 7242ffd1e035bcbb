use crate::crypto::{constant_time_eq, sha256_hex};
use crate::domain::{AuditLogEntry, NewAuditEntry};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Hash chain for tamper-evident audit logs
///
/// Each entry stores the hash of the entry appended before it, so editing or
/// removing a past row breaks every link after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashChain;

/// The fields of an audit entry that are covered by its hash
#[derive(Debug, Clone, Copy)]
pub struct HashableEntry<'a> {
    pub actor_id: Option<i64>,
    pub action: &'a str,
    pub target_type: &'a str,
    pub target_id: Option<i64>,
    pub details: &'a str,
    pub ip_address: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub previous_hash: Option<&'a str>,
}

impl<'a> HashableEntry<'a> {
    /// View of an entry that is about to be appended
    pub fn pending(
        entry: &'a NewAuditEntry,
        created_at: DateTime<Utc>,
        previous_hash: Option<&'a str>,
    ) -> Self {
        Self {
            actor_id: entry.actor_id,
            action: &entry.action,
            target_type: &entry.target_type,
            target_id: entry.target_id,
            details: &entry.details,
            ip_address: entry.ip_address.as_deref(),
            created_at,
            previous_hash,
        }
    }

    /// View of an entry read back from storage
    pub fn persisted(entry: &'a AuditLogEntry) -> Self {
        Self {
            actor_id: entry.actor_id,
            action: &entry.action,
            target_type: &entry.target_type,
            target_id: entry.target_id,
            details: &entry.details,
            ip_address: entry.ip_address.as_deref(),
            created_at: entry.created_at,
            previous_hash: entry.previous_hash.as_deref(),
        }
    }
}

/// Outcome of walking (part of) the chain
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChainReport {
    pub entries_checked: u64,
    pub intact: bool,
    pub first_broken_id: Option<i64>,
    pub reason: Option<String>,
}

/// Incremental verifier, fed entries in ascending id order
#[derive(Debug, Default)]
pub struct ChainVerifier {
    chain: HashChain,
    previous_hash: Option<String>,
    checked: u64,
    broken: Option<(i64, String)>,
}

impl HashChain {
    pub fn new() -> Self {
        Self
    }

    /// Compute the hex-encoded SHA-256 of an entry's canonical form
    pub fn compute_hash(&self, entry: &HashableEntry<'_>) -> String {
        sha256_hex(Self::canonicalize(entry).as_bytes())
    }

    /// Verify that a stored entry's hash matches its content
    pub fn verify_entry(&self, entry: &AuditLogEntry) -> bool {
        let computed = self.compute_hash(&HashableEntry::persisted(entry));
        constant_time_eq(computed.as_bytes(), entry.entry_hash.as_bytes())
    }

    /// Canonical pipe-separated representation.
    ///
    /// Timestamps are rendered with microsecond precision, which is what the
    /// database stores.
    fn canonicalize(entry: &HashableEntry<'_>) -> String {
        fn opt<T: ToString>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string())
        }

        [
            format!("actor_id={}", opt(entry.actor_id)),
            format!("action={}", entry.action),
            format!("target_type={}", entry.target_type),
            format!("target_id={}", opt(entry.target_id)),
            format!("details={}", entry.details),
            format!("ip_address={}", opt(entry.ip_address)),
            format!(
                "created_at={}",
                entry.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
            ),
            format!("previous_hash={}", opt(entry.previous_hash)),
        ]
        .join("|")
    }
}

impl ChainVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the next entry; returns false once the chain is broken
    pub fn check(&mut self, entry: &AuditLogEntry) -> bool {
        if self.broken.is_some() {
            return false;
        }
        self.checked += 1;

        if entry.previous_hash != self.previous_hash {
            tracing::warn!(
                entry_id = entry.id,
                expected = ?self.previous_hash,
                actual = ?entry.previous_hash,
                "Audit hash chain broken: previous_hash mismatch"
            );
            self.broken = Some((entry.id, "previous_hash mismatch".to_string()));
            return false;
        }

        if !self.chain.verify_entry(entry) {
            tracing::warn!(entry_id = entry.id, "Audit hash chain broken: content hash mismatch");
            self.broken = Some((entry.id, "entry_hash mismatch".to_string()));
            return false;
        }

        self.previous_hash = Some(entry.entry_hash.clone());
        true
    }

    pub fn report(self) -> ChainReport {
        let intact = self.broken.is_none();
        let (first_broken_id, reason) = match self.broken {
            Some((id, reason)) => (Some(id), Some(reason)),
            None => (None, None),
        };

        ChainReport {
            entries_checked: self.checked,
            intact,
            first_broken_id,
            reason,
        }
    }
}
