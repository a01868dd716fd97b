#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::anomaly::AnomalyFlag;
use crate::wage::WageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    WageSummary,
    FraudFlags,
    EmployerCompliance,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::WageSummary => "wage_summary",
            ReportType::FraudFlags => "fraud_flags",
            ReportType::EmployerCompliance => "employer_compliance",
        }
    }

    /// Empty selects the wage summary.
    pub fn parse(s: &str) -> Option<ReportType> {
        match s.trim() {
            "" | "wage_summary" => Some(ReportType::WageSummary),
            "fraud_flags" => Some(ReportType::FraudFlags),
            "employer_compliance" => Some(ReportType::EmployerCompliance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerTotals {
    pub total_paid: Decimal,
    pub wage_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportData {
    Wages(Vec<WageRecord>),
    Flags(Vec<AnomalyFlag>),
    Employers(BTreeMap<String, EmployerTotals>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub report_type: ReportType,
    pub generated_at: String,
    pub start_date: String,
    pub end_date: String,
    pub total_records: u64,
    pub total_amount: Decimal,
    pub data: ReportData,
}
