#![forbid(unsafe_code)]

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::{validate_text, ContractViolation, Validate};

pub const DEFAULT_REGION: &str = "DEFAULT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PovertyCategory {
    #[serde(rename = "BPL")]
    Bpl,
    #[serde(rename = "APL")]
    Apl,
}

impl PovertyCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PovertyCategory::Bpl => "BPL",
            PovertyCategory::Apl => "APL",
        }
    }

    pub fn parse(s: &str) -> Option<PovertyCategory> {
        match s {
            "BPL" => Some(PovertyCategory::Bpl),
            "APL" => Some(PovertyCategory::Apl),
            _ => None,
        }
    }
}

/// Classification outcome of a poverty check. Shares names with the
/// threshold categories but is a distinct concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PovertyStatus {
    #[serde(rename = "BPL")]
    Bpl,
    #[serde(rename = "APL")]
    Apl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PovertyThreshold {
    pub region: String,
    pub category: PovertyCategory,
    pub amount: Decimal,
    pub set_by: String,
    pub updated_at: String,
}

impl PovertyThreshold {
    pub fn v1(
        region: impl Into<String>,
        category: PovertyCategory,
        amount: Decimal,
        set_by: impl Into<String>,
        updated_at: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let t = Self {
            region: region.into(),
            category,
            amount,
            set_by: set_by.into(),
            updated_at: updated_at.into(),
        };
        t.validate()?;
        Ok(t)
    }
}

impl Validate for PovertyThreshold {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("poverty_threshold.region", &self.region, 128)?;
        if self.region.contains('_') {
            return Err(ContractViolation::InvalidValue {
                field: "poverty_threshold.region",
                reason: "must not contain '_'",
            });
        }
        if self.amount <= Decimal::ZERO {
            return Err(ContractViolation::InvalidValue {
                field: "poverty_threshold.amount",
                reason: "must be > 0",
            });
        }
        validate_text("poverty_threshold.set_by", &self.set_by, 256)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PovertyStatusResult {
    pub worker_id_hash: String,
    pub status: PovertyStatus,
    pub total_income: Decimal,
    pub threshold: Decimal,
    pub region: String,
    pub period: String,
}
