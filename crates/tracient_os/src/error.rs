#![forbid(unsafe_code)]

use thiserror::Error;
use tracient_engines::identity::IdentityError;
use tracient_kernel_contracts::access::DenyReason;
use tracient_kernel_contracts::ContractViolation;
use tracient_storage::StorageError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(#[from] ContractViolation),
    #[error("{kind} {id} already exists")]
    Duplicate { kind: &'static str, id: String },
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("access denied for {function}: {reason} ({detail})")]
    AccessDenied {
        function: String,
        reason: DenyReason,
        detail: String,
    },
    #[error("caller identity unavailable: {0}")]
    Identity(#[from] IdentityError),
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub(crate) fn invalid(field: &'static str, reason: &'static str) -> Self {
        LedgerError::Validation(ContractViolation::InvalidValue { field, reason })
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            LedgerError::AccessDenied { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}
