#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::{validate_id, validate_text, ContractViolation, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyStatus {
    Pending,
    Reviewed,
    Dismissed,
    Confirmed,
}

impl AnomalyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyStatus::Pending => "pending",
            AnomalyStatus::Reviewed => "reviewed",
            AnomalyStatus::Dismissed => "dismissed",
            AnomalyStatus::Confirmed => "confirmed",
        }
    }

    pub fn parse(s: &str) -> Option<AnomalyStatus> {
        match s {
            "pending" => Some(AnomalyStatus::Pending),
            "reviewed" => Some(AnomalyStatus::Reviewed),
            "dismissed" => Some(AnomalyStatus::Dismissed),
            "confirmed" => Some(AnomalyStatus::Confirmed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyFlag {
    pub wage_id: String,
    pub anomaly_score: f64,
    pub reason: String,
    pub flagged_by: String,
    pub status: AnomalyStatus,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    pub updated_at: String,
}

impl AnomalyFlag {
    /// A fresh flag is always pending; re-flagging replaces the whole record.
    pub fn v1(
        wage_id: impl Into<String>,
        anomaly_score: f64,
        reason: impl Into<String>,
        flagged_by: impl Into<String>,
        flagged_at: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let f = Self {
            wage_id: wage_id.into(),
            anomaly_score,
            reason: reason.into(),
            flagged_by: flagged_by.into(),
            status: AnomalyStatus::Pending,
            reviewed_by: None,
            updated_at: flagged_at.into(),
        };
        f.validate()?;
        Ok(f)
    }
}

impl Validate for AnomalyFlag {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("anomaly_flag.wage_id", &self.wage_id, 128)?;
        if !self.anomaly_score.is_finite() {
            return Err(ContractViolation::NotFinite {
                field: "anomaly_flag.anomaly_score",
            });
        }
        if !(0.0..=1.0).contains(&self.anomaly_score) {
            return Err(ContractViolation::InvalidRange {
                field: "anomaly_flag.anomaly_score",
                min: 0.0,
                max: 1.0,
                got: self.anomaly_score,
            });
        }
        if self.reason.len() > 1024 {
            return Err(ContractViolation::InvalidValue {
                field: "anomaly_flag.reason",
                reason: "too long",
            });
        }
        validate_text("anomaly_flag.flagged_by", &self.flagged_by, 256)?;
        Ok(())
    }
}
