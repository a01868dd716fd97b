#![forbid(unsafe_code)]

use serde::Serialize;
use tracing::{debug, warn};
use tracient_engines::access::AccessPolicyEngine;
use tracient_engines::identity::resolve_caller;
use tracient_kernel_contracts::access::{AccessDecision, CallerIdentity};
use tracient_kernel_contracts::audit::{AuditEventType, AuditStatus};
use tracient_storage::audit::AuditWriter;
use tracient_storage::StateStore;

use crate::error::LedgerError;

/// One ledger operation running inside one state-store transaction.
pub(crate) struct LedgerTx<'s, S: StateStore + ?Sized> {
    pub(crate) store: &'s mut S,
    pub(crate) function: &'static str,
    pub(crate) writer: AuditWriter,
}

impl<'s, S: StateStore + ?Sized> LedgerTx<'s, S> {
    pub(crate) fn begin(store: &'s mut S, function: &'static str) -> Self {
        Self {
            store,
            function,
            writer: AuditWriter::new(),
        }
    }

    /// Resolves the caller and evaluates the operation's rule. Identity
    /// failures and denials are written to the audit log before returning.
    pub(crate) fn gate(
        &mut self,
        policy: &AccessPolicyEngine,
        target_id: &str,
        target_type: &str,
        self_target: Option<&str>,
    ) -> Result<CallerIdentity, LedgerError> {
        let caller = match resolve_caller(self.store.caller_credential()) {
            Ok(c) => c,
            Err(e) => {
                warn!(function = self.function, error = %e, "caller identity rejected");
                self.record_decision(
                    AuditEventType::AccessDenied,
                    target_id,
                    target_type,
                    AuditStatus::Denied,
                    format!("identity: {e}"),
                )?;
                return Err(e.into());
            }
        };

        match policy.authorize(self.function, &caller, self_target) {
            AccessDecision::Allow => {
                debug!(
                    function = self.function,
                    caller = %caller.id,
                    role = caller.role.as_str(),
                    "access granted"
                );
                Ok(caller)
            }
            AccessDecision::Deny { reason, detail } => {
                warn!(
                    function = self.function,
                    caller = %caller.id,
                    reason = reason.as_str(),
                    "access denied"
                );
                self.record_decision(
                    AuditEventType::AccessDenied,
                    target_id,
                    target_type,
                    AuditStatus::Denied,
                    format!("{reason}: {detail}"),
                )?;
                Err(LedgerError::AccessDenied {
                    function: self.function.to_string(),
                    reason,
                    detail,
                })
            }
        }
    }

    /// Passes `result` through; a failure is first logged with status=error.
    /// If that audit write itself fails, its error wins.
    pub(crate) fn audited<T>(
        &mut self,
        event_type: AuditEventType,
        target_id: &str,
        target_type: &str,
        result: Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        match result {
            Ok(v) => Ok(v),
            Err(e) => {
                self.record_decision(
                    event_type,
                    target_id,
                    target_type,
                    AuditStatus::Error,
                    e.to_string(),
                )?;
                Err(e)
            }
        }
    }

    /// Fire-and-forget notification; an unserializable payload is dropped.
    pub(crate) fn notify<T: Serialize>(&mut self, name: &str, payload: &T) {
        match serde_json::to_vec(payload) {
            Ok(bytes) => self.store.emit_event(name, bytes),
            Err(e) => warn!(event = name, error = %e, "event payload not serializable"),
        }
    }
}
