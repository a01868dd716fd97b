#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use tracient_kernel_contracts::threshold::PovertyCategory;

pub const WAGE_PREFIX: &str = "WAGE";
pub const USER_PREFIX: &str = "USER";
pub const THRESHOLD_PREFIX: &str = "THRESHOLD";
pub const ANOMALY_PREFIX: &str = "ANOMALY";
pub const AUDIT_PREFIX: &str = "AUDIT";

/// Exclusive upper bound for a prefix scan. Sorts after every printable
/// ASCII character, so it also covers ids containing `~`.
const SCAN_END: char = '\u{7f}';

pub fn wage_key(wage_id: &str) -> String {
    format!("{WAGE_PREFIX}_{wage_id}")
}

pub fn user_key(user_id_hash: &str) -> String {
    format!("{USER_PREFIX}_{user_id_hash}")
}

pub fn threshold_key(region: &str, category: PovertyCategory) -> String {
    format!("{THRESHOLD_PREFIX}_{region}_{}", category.as_str())
}

pub fn anomaly_key(wage_id: &str) -> String {
    format!("{ANOMALY_PREFIX}_{wage_id}")
}

/// Fixed-width timestamp first, so key order is time order.
pub fn audit_key(at: DateTime<Utc>, tx_id: &str, seq: u32) -> String {
    format!(
        "{AUDIT_PREFIX}_{}_{tx_id}_{seq:04}",
        at.format("%Y%m%d%H%M%S%.9f")
    )
}

pub fn prefix_range(prefix: &str) -> (String, String) {
    (format!("{prefix}_"), format!("{prefix}_{SCAN_END}"))
}
