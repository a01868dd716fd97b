#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::{parse_timestamp, validate_id, validate_text, ContractViolation, Validate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WageRecord {
    pub wage_id: String,
    pub worker_id_hash: String,
    pub employer_id_hash: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub job_type: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub policy_version: String,
}

impl WageRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        wage_id: impl Into<String>,
        worker_id_hash: impl Into<String>,
        employer_id_hash: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
        job_type: impl Into<String>,
        timestamp: impl Into<String>,
        policy_version: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let w = Self {
            wage_id: wage_id.into(),
            worker_id_hash: worker_id_hash.into(),
            employer_id_hash: employer_id_hash.into(),
            amount,
            currency: currency.into(),
            job_type: job_type.into(),
            timestamp: timestamp.into(),
            policy_version: policy_version.into(),
        };
        w.validate()?;
        Ok(w)
    }

    /// Fills an empty timestamp with the transaction time.
    pub fn with_default_timestamp(mut self, tx_time: DateTime<Utc>) -> Self {
        if self.timestamp.trim().is_empty() {
            self.timestamp = tx_time.to_rfc3339();
        }
        self
    }

    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp("wage_record.timestamp", &self.timestamp).ok()
    }
}

impl Validate for WageRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("wage_record.wage_id", &self.wage_id, 128)?;
        validate_id("wage_record.worker_id_hash", &self.worker_id_hash, 256)?;
        validate_id("wage_record.employer_id_hash", &self.employer_id_hash, 256)?;
        if self.amount <= Decimal::ZERO {
            return Err(ContractViolation::InvalidValue {
                field: "wage_record.amount",
                reason: "must be > 0",
            });
        }
        validate_text("wage_record.currency", &self.currency, 16)?;
        if self.job_type.len() > 128 {
            return Err(ContractViolation::InvalidValue {
                field: "wage_record.job_type",
                reason: "too long",
            });
        }
        if self.policy_version.len() > 64 {
            return Err(ContractViolation::InvalidValue {
                field: "wage_record.policy_version",
                reason: "too long",
            });
        }
        parse_timestamp("wage_record.timestamp", &self.timestamp)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyIncome {
    pub month: String,
    pub total_income: Decimal,
    pub wage_count: u32,
}
