#![forbid(unsafe_code)]

use tracient_kernel_contracts::audit::{AuditStatus, RiskLevel};
use tracient_kernel_contracts::ops;

const HIGH_SENSITIVITY: [&str; 5] = [
    ops::SET_POVERTY_THRESHOLD,
    ops::UPDATE_USER_STATUS,
    ops::REGISTER_USER,
    ops::INIT_LEDGER,
    ops::GET_ACCESS_DENIALS,
];

const MEDIUM_SENSITIVITY: [&str; 6] = [
    ops::RECORD_WAGE,
    ops::BATCH_RECORD_WAGES,
    ops::FLAG_ANOMALY,
    ops::UPDATE_ANOMALY_STATUS,
    ops::GENERATE_COMPLIANCE_REPORT,
    ops::GET_AUDIT_LOGS,
];

pub fn function_sensitivity(function: &str) -> RiskLevel {
    if HIGH_SENSITIVITY.contains(&function) {
        RiskLevel::High
    } else if MEDIUM_SENSITIVITY.contains(&function) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Denials sit one level above the function's own sensitivity.
pub fn classify_risk(function: &str, status: AuditStatus) -> RiskLevel {
    let base = function_sensitivity(function);
    match status {
        AuditStatus::Denied => base.escalate(),
        AuditStatus::Success | AuditStatus::Error => base,
    }
}
