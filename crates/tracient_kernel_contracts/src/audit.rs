#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize};

use crate::common::{validate_text, ContractViolation, Validate};

pub const UNKNOWN_CALLER: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    AccessGranted,
    AccessDenied,
    DataRead,
    DataWrite,
    UserRegistered,
    UserUpdated,
    UserSuspended,
    UserActivated,
    AnomalyFlagged,
    AnomalyReviewed,
    ThresholdChanged,
    ReportGenerated,
    LedgerInitialized,
}

impl AuditEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEventType::AccessGranted => "ACCESS_GRANTED",
            AuditEventType::AccessDenied => "ACCESS_DENIED",
            AuditEventType::DataRead => "DATA_READ",
            AuditEventType::DataWrite => "DATA_WRITE",
            AuditEventType::UserRegistered => "USER_REGISTERED",
            AuditEventType::UserUpdated => "USER_UPDATED",
            AuditEventType::UserSuspended => "USER_SUSPENDED",
            AuditEventType::UserActivated => "USER_ACTIVATED",
            AuditEventType::AnomalyFlagged => "ANOMALY_FLAGGED",
            AuditEventType::AnomalyReviewed => "ANOMALY_REVIEWED",
            AuditEventType::ThresholdChanged => "THRESHOLD_CHANGED",
            AuditEventType::ReportGenerated => "REPORT_GENERATED",
            AuditEventType::LedgerInitialized => "LEDGER_INITIALIZED",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Denied,
    Error,
}

impl AuditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Denied => "denied",
            AuditStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// One step up; critical saturates.
    pub fn escalate(self) -> RiskLevel {
        match self {
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium => RiskLevel::High,
            RiskLevel::High | RiskLevel::Critical => RiskLevel::Critical,
        }
    }

    pub fn is_high_or_above(self) -> bool {
        self >= RiskLevel::High
    }
}

/// Everything the audit writer needs from the caller; key, log id, tx id,
/// timestamp and digest are assigned at append time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEventInput {
    pub event_type: AuditEventType,
    pub function: String,
    pub caller_id: String,
    pub caller_id_hash: String,
    pub caller_org: String,
    pub caller_role: String,
    pub target_id: String,
    pub target_type: String,
    pub status: AuditStatus,
    pub risk_level: RiskLevel,
    pub details: String,
}

impl AuditEventInput {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        event_type: AuditEventType,
        function: impl Into<String>,
        caller_id: impl Into<String>,
        caller_id_hash: impl Into<String>,
        caller_org: impl Into<String>,
        caller_role: impl Into<String>,
        target_id: impl Into<String>,
        target_type: impl Into<String>,
        status: AuditStatus,
        risk_level: RiskLevel,
        details: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let e = Self {
            event_type,
            function: function.into(),
            caller_id: caller_id.into(),
            caller_id_hash: caller_id_hash.into(),
            caller_org: caller_org.into(),
            caller_role: caller_role.into(),
            target_id: target_id.into(),
            target_type: target_type.into(),
            status,
            risk_level,
            details: details.into(),
        };
        e.validate()?;
        Ok(e)
    }
}

impl Validate for AuditEventInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("audit_event_input.function", &self.function, 128)?;
        validate_text("audit_event_input.caller_id", &self.caller_id, 512)?;
        validate_text("audit_event_input.caller_id_hash", &self.caller_id_hash, 512)?;
        validate_text("audit_event_input.caller_org", &self.caller_org, 128)?;
        validate_text("audit_event_input.caller_role", &self.caller_role, 64)?;
        if self.details.len() > 4096 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_event_input.details",
                reason: "must be <= 4096 bytes",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub log_id: String,
    pub timestamp: String,
    pub event_type: AuditEventType,
    pub function: String,
    pub caller_id: String,
    pub caller_id_hash: String,
    pub caller_org: String,
    pub caller_role: String,
    pub target_id: String,
    pub target_type: String,
    pub status: AuditStatus,
    pub risk_level: RiskLevel,
    pub details: String,
    pub tx_id: String,
    pub entry_hash: String,
}

impl AuditLogEntry {
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Filter for audit log queries. Empty strings and `None` match everything;
/// a zero limit means "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditQuery {
    pub start_date: String,
    pub end_date: String,
    pub event_types: Vec<AuditEventType>,
    pub caller_id: String,
    pub target_id: String,
    #[serde(deserialize_with = "empty_as_none")]
    pub status: Option<AuditStatus>,
    #[serde(deserialize_with = "empty_as_none")]
    pub risk_level: Option<RiskLevel>,
    pub limit: usize,
}

/// Callers send `""` for an unset enum filter.
fn empty_as_none<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw: Option<String> = Option::deserialize(d)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => {
            T::deserialize(IntoDeserializer::<D::Error>::into_deserializer(s.to_string())).map(Some)
        }
    }
}

impl AuditQuery {
    /// Range is applied separately; this covers the field filters.
    pub fn matches_fields(&self, e: &AuditLogEntry) -> bool {
        if !self.event_types.is_empty() && !self.event_types.contains(&e.event_type) {
            return false;
        }
        if !self.caller_id.is_empty()
            && e.caller_id != self.caller_id
            && e.caller_id_hash != self.caller_id
        {
            return false;
        }
        if !self.target_id.is_empty() && e.target_id != self.target_id {
            return false;
        }
        if self.status.is_some_and(|s| s != e.status) {
            return false;
        }
        if self.risk_level.is_some_and(|r| r != e.risk_level) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub total_events: u64,
    pub success_count: u64,
    pub denied_count: u64,
    pub error_count: u64,
    pub events_by_type: BTreeMap<String, u64>,
    pub events_by_function: BTreeMap<String, u64>,
    pub events_by_risk_level: BTreeMap<String, u64>,
    pub period: String,
}

impl AuditSummary {
    pub fn with_period(period: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            ..Self::default()
        }
    }

    pub fn add(&mut self, e: &AuditLogEntry) {
        self.total_events += 1;
        match e.status {
            AuditStatus::Success => self.success_count += 1,
            AuditStatus::Denied => self.denied_count += 1,
            AuditStatus::Error => self.error_count += 1,
        }
        *self
            .events_by_type
            .entry(e.event_type.as_str().to_string())
            .or_insert(0) += 1;
        *self.events_by_function.entry(e.function.clone()).or_insert(0) += 1;
        *self
            .events_by_risk_level
            .entry(e.risk_level.as_str().to_string())
            .or_insert(0) += 1;
    }
}
