#![forbid(unsafe_code)]

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;
use tracient_kernel_contracts::audit::{AuditEventInput, AuditLogEntry};
use tracient_kernel_contracts::Validate;

use crate::keys::audit_key;
use crate::repo::AuditRepo;
use crate::state::{StateStore, StorageError};

pub const HIGH_RISK_ACTIVITY_EVENT: &str = "HighRiskActivity";

const MAX_KEY_PROBES: u32 = 10_000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HighRiskActivity<'a> {
    log_id: &'a str,
    event_type: &'a str,
    risk_level: &'a str,
    function: &'a str,
    caller_id: &'a str,
}

/// Append-only writer into the `AUDIT_` table.
///
/// Keys are `timestamp + txid + sequence`. The sequence starts at zero for
/// each writer and skips any key that is already occupied, so entries from
/// the same transaction (or from transactions sharing a timestamp) never
/// collide and nothing is ever overwritten.
#[derive(Debug, Default)]
pub struct AuditWriter {
    next_seq: u32,
}

impl AuditWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit<S: StateStore + ?Sized>(
        &mut self,
        store: &mut S,
        input: AuditEventInput,
    ) -> Result<AuditLogEntry, StorageError> {
        input.validate()?;

        let at = store.tx_timestamp();
        let tx_id = store.tx_id().to_string();
        let key = self.next_free_key(store, at, &tx_id)?;

        let mut entry = AuditLogEntry {
            log_id: key.clone(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            event_type: input.event_type,
            function: input.function,
            caller_id: input.caller_id,
            caller_id_hash: input.caller_id_hash,
            caller_org: input.caller_org,
            caller_role: input.caller_role,
            target_id: input.target_id,
            target_type: input.target_type,
            status: input.status,
            risk_level: input.risk_level,
            details: input.details,
            tx_id,
            entry_hash: String::new(),
        };
        entry.entry_hash = entry_digest(&entry);
        store.append_audit_row(&key, &entry)?;
        debug!(
            log_id = %entry.log_id,
            event_type = entry.event_type.as_str(),
            status = entry.status.as_str(),
            "audit entry appended"
        );

        if entry.risk_level.is_high_or_above() {
            let notice = HighRiskActivity {
                log_id: &entry.log_id,
                event_type: entry.event_type.as_str(),
                risk_level: entry.risk_level.as_str(),
                function: &entry.function,
                caller_id: &entry.caller_id,
            };
            if let Ok(payload) = serde_json::to_vec(&notice) {
                store.emit_event(HIGH_RISK_ACTIVITY_EVENT, payload);
            }
        }
        Ok(entry)
    }

    fn next_free_key<S: StateStore + ?Sized>(
        &mut self,
        store: &S,
        at: DateTime<Utc>,
        tx_id: &str,
    ) -> Result<String, StorageError> {
        for _ in 0..MAX_KEY_PROBES {
            let key = audit_key(at, tx_id, self.next_seq);
            self.next_seq = self.next_seq.saturating_add(1);
            if !store.audit_row_exists(&key)? {
                return Ok(key);
            }
        }
        Err(StorageError::Backend(format!("no free audit key for tx {tx_id}")))
    }
}

/// SHA-256 over every field except the digest itself, hex encoded.
pub fn entry_digest(e: &AuditLogEntry) -> String {
    let mut h = Sha256::new();
    for field in [
        e.log_id.as_str(),
        e.timestamp.as_str(),
        e.event_type.as_str(),
        e.function.as_str(),
        e.caller_id.as_str(),
        e.caller_id_hash.as_str(),
        e.caller_org.as_str(),
        e.caller_role.as_str(),
        e.target_id.as_str(),
        e.target_type.as_str(),
        e.status.as_str(),
        e.risk_level.as_str(),
        e.details.as_str(),
        e.tx_id.as_str(),
    ] {
        h.update((field.len() as u64).to_be_bytes());
        h.update(field.as_bytes());
    }
    h.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

pub fn verify_entry_digest(e: &AuditLogEntry) -> bool {
    entry_digest(e) == e.entry_hash
}
