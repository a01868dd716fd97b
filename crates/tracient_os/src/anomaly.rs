#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use tracing::info;
use tracient_engines::income::in_range;
use tracient_kernel_contracts::anomaly::{AnomalyFlag, AnomalyStatus};
use tracient_kernel_contracts::audit::{AuditEventType, AuditStatus};
use tracient_kernel_contracts::common::{parse_timestamp, validate_text};
use tracient_kernel_contracts::report::{ComplianceReport, EmployerTotals, ReportData, ReportType};
use tracient_kernel_contracts::wage::WageRecord;
use tracient_kernel_contracts::{ops, ContractViolation, DateRange};
use tracient_storage::repo::{AnomalyRepo, WageRepo};
use tracient_storage::StateStore;

use crate::error::LedgerError;
use crate::ledger::{events, TracientLedger};
use crate::tx::LedgerTx;

const ANOMALY_TARGET: &str = "anomaly";
const REPORT_TARGET: &str = "report";

fn flag_in_range(flag: &AnomalyFlag, range: &DateRange) -> bool {
    match parse_timestamp("anomaly_flag.updated_at", &flag.updated_at) {
        Ok(t) => range.contains(t),
        Err(_) => range.start.is_none() && range.end.is_none(),
    }
}

fn sum_amounts<'a>(wages: impl IntoIterator<Item = &'a WageRecord>) -> Decimal {
    wages
        .into_iter()
        .fold(Decimal::ZERO, |acc, w| acc.saturating_add(w.amount))
}

/// Builds the report body from full wage and flag scans.
fn build_report(
    report_type: ReportType,
    range: &DateRange,
    wages: Vec<WageRecord>,
    flags: Vec<AnomalyFlag>,
) -> (u64, Decimal, ReportData) {
    match report_type {
        ReportType::WageSummary => {
            let rows: Vec<WageRecord> = wages.into_iter().filter(|w| in_range(w, range)).collect();
            let total = sum_amounts(&rows);
            (rows.len() as u64, total, ReportData::Wages(rows))
        }
        ReportType::FraudFlags => {
            let rows: Vec<AnomalyFlag> = flags
                .into_iter()
                .filter(|f| flag_in_range(f, range))
                .collect();
            let flagged: BTreeSet<&str> = rows.iter().map(|f| f.wage_id.as_str()).collect();
            let total = sum_amounts(wages.iter().filter(|w| flagged.contains(w.wage_id.as_str())));
            (rows.len() as u64, total, ReportData::Flags(rows))
        }
        ReportType::EmployerCompliance => {
            let mut by_employer: BTreeMap<String, EmployerTotals> = BTreeMap::new();
            let mut count = 0u64;
            let mut total = Decimal::ZERO;
            for w in wages.iter().filter(|w| in_range(w, range)) {
                let e = by_employer.entry(w.employer_id_hash.clone()).or_default();
                e.total_paid = e.total_paid.saturating_add(w.amount);
                e.wage_count += 1;
                count += 1;
                total = total.saturating_add(w.amount);
            }
            (count, total, ReportData::Employers(by_employer))
        }
    }
}

impl TracientLedger {
    /// Re-flagging replaces the previous flag and resets it to pending.
    pub fn flag_anomaly<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        wage_id: &str,
        score: f64,
        reason: &str,
        flagged_by: &str,
    ) -> Result<AnomalyFlag, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::FLAG_ANOMALY);
        let caller = tx.gate(&self.policy, wage_id, ANOMALY_TARGET, None)?;
        tx.record_decision(
            AuditEventType::AccessGranted,
            wage_id,
            ANOMALY_TARGET,
            AuditStatus::Success,
            format!("role {}", caller.role),
        )?;

        let flagged_at = tx.store.tx_timestamp().to_rfc3339();
        let flag = AnomalyFlag::v1(wage_id, score, reason, flagged_by, flagged_at)
            .map_err(LedgerError::from);
        let flag = tx.audited(AuditEventType::AnomalyFlagged, wage_id, ANOMALY_TARGET, flag)?;
        let wage_exists = tx
            .store
            .wage_row_exists(wage_id)
            .map_err(LedgerError::from)
            .and_then(|exists| {
                if exists {
                    Ok(())
                } else {
                    Err(LedgerError::not_found("wage", wage_id))
                }
            });
        tx.audited(AuditEventType::AnomalyFlagged, wage_id, ANOMALY_TARGET, wage_exists)?;
        let written = tx.store.put_anomaly_row(&flag).map_err(LedgerError::from);
        tx.audited(AuditEventType::AnomalyFlagged, wage_id, ANOMALY_TARGET, written)?;

        tx.notify(events::ANOMALY_FLAGGED, &flag);
        tx.record_decision(
            AuditEventType::AnomalyFlagged,
            wage_id,
            ANOMALY_TARGET,
            AuditStatus::Success,
            format!("score {} by {flagged_by}", flag.anomaly_score),
        )?;
        info!(wage_id, score = flag.anomaly_score, "anomaly flagged");
        Ok(flag)
    }

    /// Flags with `anomaly_score >= min_score`, in wage-id order.
    pub fn get_flagged_wages<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        min_score: f64,
    ) -> Result<Vec<AnomalyFlag>, LedgerError> {
        let target = format!("minScore:{min_score}");
        let mut tx = LedgerTx::begin(store, ops::GET_FLAGGED_WAGES);
        tx.gate(&self.policy, &target, ANOMALY_TARGET, None)?;

        let checked = if min_score.is_finite() {
            Ok(())
        } else {
            Err(LedgerError::Validation(ContractViolation::NotFinite {
                field: "min_score",
            }))
        };
        tx.audited(AuditEventType::DataRead, &target, ANOMALY_TARGET, checked)?;
        let flags = tx.store.anomaly_rows().map_err(LedgerError::from);
        let flags = tx.audited(AuditEventType::DataRead, &target, ANOMALY_TARGET, flags)?;
        let out: Vec<AnomalyFlag> = flags
            .into_iter()
            .filter(|f| f.anomaly_score >= min_score)
            .collect();

        tx.record_decision(
            AuditEventType::DataRead,
            &target,
            ANOMALY_TARGET,
            AuditStatus::Success,
            format!("returned {} flags", out.len()),
        )?;
        Ok(out)
    }

    pub fn update_anomaly_status<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        wage_id: &str,
        status: &str,
        reviewed_by: &str,
    ) -> Result<AnomalyFlag, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::UPDATE_ANOMALY_STATUS);
        let caller = tx.gate(&self.policy, wage_id, ANOMALY_TARGET, None)?;
        tx.record_decision(
            AuditEventType::AccessGranted,
            wage_id,
            ANOMALY_TARGET,
            AuditStatus::Success,
            format!("role {}", caller.role),
        )?;

        let parsed = AnomalyStatus::parse(status)
            .ok_or_else(|| LedgerError::invalid("status", "unknown anomaly status"))
            .and_then(|s| {
                validate_text("reviewed_by", reviewed_by, 256)?;
                Ok(s)
            });
        let new_status = tx.audited(AuditEventType::AnomalyReviewed, wage_id, ANOMALY_TARGET, parsed)?;
        let found = tx
            .store
            .anomaly_row(wage_id)
            .map_err(LedgerError::from)
            .and_then(|f| f.ok_or_else(|| LedgerError::not_found("anomaly", wage_id)));
        let mut flag = tx.audited(AuditEventType::AnomalyReviewed, wage_id, ANOMALY_TARGET, found)?;
        let previous = flag.status;
        flag.status = new_status;
        flag.reviewed_by = Some(reviewed_by.to_string());
        flag.updated_at = tx.store.tx_timestamp().to_rfc3339();
        let written = tx.store.put_anomaly_row(&flag).map_err(LedgerError::from);
        tx.audited(AuditEventType::AnomalyReviewed, wage_id, ANOMALY_TARGET, written)?;

        tx.record_decision(
            AuditEventType::AnomalyReviewed,
            wage_id,
            ANOMALY_TARGET,
            AuditStatus::Success,
            format!(
                "{} -> {} by {reviewed_by}",
                previous.as_str(),
                new_status.as_str()
            ),
        )?;
        info!(wage_id, status = new_status.as_str(), "anomaly reviewed");
        Ok(flag)
    }

    pub fn generate_compliance_report<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        start_date: &str,
        end_date: &str,
        report_type: &str,
    ) -> Result<ComplianceReport, LedgerError> {
        let target = if report_type.trim().is_empty() {
            ReportType::WageSummary.as_str()
        } else {
            report_type
        };
        let mut tx = LedgerTx::begin(store, ops::GENERATE_COMPLIANCE_REPORT);
        tx.gate(&self.policy, target, REPORT_TARGET, None)?;

        let parsed = ReportType::parse(report_type)
            .ok_or_else(|| LedgerError::invalid("report_type", "unknown report type"))
            .and_then(|t| Ok((t, DateRange::parse(start_date, end_date)?)));
        let (kind, range) = tx.audited(AuditEventType::ReportGenerated, target, REPORT_TARGET, parsed)?;
        let wages = tx.store.wage_rows().map_err(LedgerError::from);
        let wages = tx.audited(AuditEventType::ReportGenerated, target, REPORT_TARGET, wages)?;
        let flags = match kind {
            ReportType::FraudFlags => tx.store.anomaly_rows().map_err(LedgerError::from),
            _ => Ok(Vec::new()),
        };
        let flags = tx.audited(AuditEventType::ReportGenerated, target, REPORT_TARGET, flags)?;

        let (total_records, total_amount, data) = build_report(kind, &range, wages, flags);
        let report = ComplianceReport {
            report_type: kind,
            generated_at: tx.store.tx_timestamp().to_rfc3339(),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            total_records,
            total_amount,
            data,
        };

        tx.record_decision(
            AuditEventType::ReportGenerated,
            target,
            REPORT_TARGET,
            AuditStatus::Success,
            format!("{} records, total {}", report.total_records, report.total_amount),
        )?;
        info!(report_type = kind.as_str(), records = report.total_records, "compliance report generated");
        Ok(report)
    }
}
