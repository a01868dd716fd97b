#![forbid(unsafe_code)]

use tracient_engines::identity::resolve_caller;
use tracient_engines::income::period_label;
use tracient_engines::risk::classify_risk;
use tracient_kernel_contracts::audit::{
    AuditEventInput, AuditEventType, AuditLogEntry, AuditQuery, AuditStatus, AuditSummary,
    UNKNOWN_CALLER,
};
use tracient_kernel_contracts::common::validate_id;
use tracient_kernel_contracts::{ops, DateRange};
use tracient_storage::repo::AuditRepo;
use tracient_storage::StateStore;

use crate::config::clamp_limit;
use crate::error::LedgerError;
use crate::ledger::TracientLedger;
use crate::tx::LedgerTx;

const MAX_DETAILS_BYTES: usize = 4096;
const AUDIT_TARGET: &str = "audit_log";

fn clip(details: String) -> String {
    if details.len() <= MAX_DETAILS_BYTES {
        return details;
    }
    let mut end = MAX_DETAILS_BYTES;
    while !details.is_char_boundary(end) {
        end -= 1;
    }
    details[..end].to_string()
}

fn entry_in_range(e: &AuditLogEntry, range: &DateRange) -> bool {
    match e.occurred_at() {
        Some(t) => range.contains(t),
        None => range.start.is_none() && range.end.is_none(),
    }
}

impl<S: StateStore + ?Sized> LedgerTx<'_, S> {
    /// Appends one audit entry for this transaction's function. The caller
    /// is resolved again here; an unresolvable caller is recorded as
    /// `unknown`.
    pub(crate) fn record_decision(
        &mut self,
        event_type: AuditEventType,
        target_id: &str,
        target_type: &str,
        status: AuditStatus,
        details: impl Into<String>,
    ) -> Result<AuditLogEntry, LedgerError> {
        let (caller_id, caller_id_hash, caller_org, caller_role) =
            match resolve_caller(self.store.caller_credential()) {
                Ok(c) => (c.id, c.id_hash, c.organization_id, c.role.as_str().to_string()),
                Err(_) => (
                    UNKNOWN_CALLER.to_string(),
                    UNKNOWN_CALLER.to_string(),
                    UNKNOWN_CALLER.to_string(),
                    UNKNOWN_CALLER.to_string(),
                ),
            };
        let input = AuditEventInput::v1(
            event_type,
            self.function,
            caller_id,
            caller_id_hash,
            caller_org,
            caller_role,
            target_id,
            target_type,
            status,
            classify_risk(self.function, status),
            clip(details.into()),
        )?;
        Ok(self.writer.emit(self.store, input)?)
    }
}

impl TracientLedger {
    /// Records an access decision on behalf of an outer layer, attributed to
    /// `function` and the transaction's caller.
    #[allow(clippy::too_many_arguments)]
    pub fn record_decision<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        event_type: AuditEventType,
        function: &'static str,
        target_id: &str,
        target_type: &str,
        status: AuditStatus,
        details: &str,
    ) -> Result<AuditLogEntry, LedgerError> {
        LedgerTx::begin(store, function).record_decision(
            event_type,
            target_id,
            target_type,
            status,
            details,
        )
    }

    /// Filtered audit trail in key order (non-decreasing timestamp).
    pub fn get_audit_logs<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        query: &AuditQuery,
    ) -> Result<Vec<AuditLogEntry>, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::GET_AUDIT_LOGS);
        tx.gate(&self.policy, "", AUDIT_TARGET, None)?;

        let range = DateRange::parse(&query.start_date, &query.end_date).map_err(LedgerError::from);
        let range = tx.audited(AuditEventType::DataRead, "", AUDIT_TARGET, range)?;
        let rows = tx.store.audit_rows().map_err(LedgerError::from);
        let rows = tx.audited(AuditEventType::DataRead, "", AUDIT_TARGET, rows)?;

        let limit = clamp_limit(
            query.limit,
            self.config.audit_default_limit,
            self.config.audit_max_limit,
        );
        let out: Vec<AuditLogEntry> = rows
            .into_iter()
            .filter(|e| query.matches_fields(e) && entry_in_range(e, &range))
            .take(limit)
            .collect();

        tx.record_decision(
            AuditEventType::DataRead,
            "",
            AUDIT_TARGET,
            AuditStatus::Success,
            format!("returned {} entries", out.len()),
        )?;
        Ok(out)
    }

    pub fn get_audit_summary<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        start_date: &str,
        end_date: &str,
    ) -> Result<AuditSummary, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::GET_AUDIT_SUMMARY);
        tx.gate(&self.policy, "", AUDIT_TARGET, None)?;

        let range = DateRange::parse(start_date, end_date).map_err(LedgerError::from);
        let range = tx.audited(AuditEventType::DataRead, "", AUDIT_TARGET, range)?;
        let rows = tx.store.audit_rows().map_err(LedgerError::from);
        let rows = tx.audited(AuditEventType::DataRead, "", AUDIT_TARGET, rows)?;

        let mut summary = AuditSummary::with_period(period_label(start_date, end_date));
        for e in rows.iter().filter(|e| entry_in_range(e, &range)) {
            summary.add(e);
        }

        tx.record_decision(
            AuditEventType::DataRead,
            "",
            AUDIT_TARGET,
            AuditStatus::Success,
            format!("summarized {} entries", summary.total_events),
        )?;
        Ok(summary)
    }

    /// High and critical entries, oldest first.
    pub fn get_high_risk_events<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        limit: usize,
    ) -> Result<Vec<AuditLogEntry>, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::GET_HIGH_RISK_EVENTS);
        tx.gate(&self.policy, "", AUDIT_TARGET, None)?;

        let rows = tx.store.audit_rows().map_err(LedgerError::from);
        let rows = tx.audited(AuditEventType::DataRead, "", AUDIT_TARGET, rows)?;
        let limit = clamp_limit(
            limit,
            self.config.high_risk_default_limit,
            self.config.high_risk_max_limit,
        );
        let out: Vec<AuditLogEntry> = rows
            .into_iter()
            .filter(|e| e.risk_level.is_high_or_above())
            .take(limit)
            .collect();

        tx.record_decision(
            AuditEventType::DataRead,
            "",
            AUDIT_TARGET,
            AuditStatus::Success,
            format!("returned {} high-risk entries", out.len()),
        )?;
        Ok(out)
    }

    pub fn get_access_denials<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<AuditLogEntry>, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::GET_ACCESS_DENIALS);
        tx.gate(&self.policy, "", AUDIT_TARGET, None)?;

        let range = DateRange::parse(start_date, end_date).map_err(LedgerError::from);
        let range = tx.audited(AuditEventType::DataRead, "", AUDIT_TARGET, range)?;
        let rows = tx.store.audit_rows().map_err(LedgerError::from);
        let rows = tx.audited(AuditEventType::DataRead, "", AUDIT_TARGET, rows)?;
        let out: Vec<AuditLogEntry> = rows
            .into_iter()
            .filter(|e| {
                (e.status == AuditStatus::Denied || e.event_type == AuditEventType::AccessDenied)
                    && entry_in_range(e, &range)
            })
            .collect();

        tx.record_decision(
            AuditEventType::DataRead,
            "",
            AUDIT_TARGET,
            AuditStatus::Success,
            format!("returned {} denials", out.len()),
        )?;
        Ok(out)
    }

    /// Entries where the given hash acted, matched on caller hash or id.
    pub fn get_user_activity_log<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        user_id_hash: &str,
    ) -> Result<Vec<AuditLogEntry>, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::GET_USER_ACTIVITY_LOG);
        tx.gate(&self.policy, user_id_hash, AUDIT_TARGET, Some(user_id_hash))?;

        let checked = validate_id("user_id_hash", user_id_hash, 256).map_err(LedgerError::from);
        tx.audited(AuditEventType::DataRead, user_id_hash, AUDIT_TARGET, checked)?;
        let rows = tx.store.audit_rows().map_err(LedgerError::from);
        let rows = tx.audited(AuditEventType::DataRead, user_id_hash, AUDIT_TARGET, rows)?;
        let out: Vec<AuditLogEntry> = rows
            .into_iter()
            .filter(|e| e.caller_id_hash == user_id_hash || e.caller_id == user_id_hash)
            .take(self.config.activity_log_limit)
            .collect();

        tx.record_decision(
            AuditEventType::DataRead,
            user_id_hash,
            AUDIT_TARGET,
            AuditStatus::Success,
            format!("returned {} entries", out.len()),
        )?;
        Ok(out)
    }
}
