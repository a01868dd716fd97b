#![forbid(unsafe_code)]

use rust_decimal::Decimal;
use tracient_kernel_contracts::threshold::{PovertyCategory, DEFAULT_REGION};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdSeed {
    pub category: PovertyCategory,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub default_region: String,
    /// BPL line used when no threshold is stored for the region or default.
    pub fallback_bpl_threshold: Decimal,
    pub seed_thresholds: Vec<ThresholdSeed>,
    pub audit_default_limit: usize,
    pub audit_max_limit: usize,
    pub high_risk_default_limit: usize,
    pub high_risk_max_limit: usize,
    pub activity_log_limit: usize,
    pub history_default_months: usize,
    /// Minimum score used when a positional argument does not parse.
    pub flagged_default_min_score: f64,
    pub max_batch_size: usize,
}

impl LedgerConfig {
    pub fn mvp_v1() -> Self {
        Self {
            default_region: DEFAULT_REGION.to_string(),
            fallback_bpl_threshold: Decimal::new(32_000, 0),
            seed_thresholds: vec![
                ThresholdSeed {
                    category: PovertyCategory::Bpl,
                    amount: Decimal::new(32_000, 0),
                },
                ThresholdSeed {
                    category: PovertyCategory::Apl,
                    amount: Decimal::new(100_000, 0),
                },
            ],
            audit_default_limit: 100,
            audit_max_limit: 1000,
            high_risk_default_limit: 100,
            high_risk_max_limit: 500,
            activity_log_limit: 500,
            history_default_months: 12,
            flagged_default_min_score: 0.5,
            max_batch_size: 500,
        }
    }
}

/// Zero selects the default; anything above the cap is clamped.
pub(crate) fn clamp_limit(requested: usize, default: usize, max: usize) -> usize {
    match requested {
        0 => default.min(max),
        n => n.min(max),
    }
}
