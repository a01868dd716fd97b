#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use tracient_engines::income::{monthly_income_history, total_income};
use tracient_kernel_contracts::audit::{AuditEventType, AuditStatus};
use tracient_kernel_contracts::common::validate_id;
use tracient_kernel_contracts::wage::{MonthlyIncome, WageRecord};
use tracient_kernel_contracts::{ops, DateRange, Validate};
use tracient_storage::repo::WageRepo;
use tracient_storage::StateStore;

use crate::error::LedgerError;
use crate::ledger::{events, TracientLedger};
use crate::tx::LedgerTx;

const WAGE_TARGET: &str = "wage";
const WORKER_TARGET: &str = "worker";
const EMPLOYER_TARGET: &str = "employer";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WageBatchRecorded<'a> {
    count: usize,
    wage_ids: &'a [String],
}

/// Fills the timestamp, validates, and rejects ids already stored or
/// already seen earlier in the same batch.
fn prepare_wage<S: StateStore + ?Sized>(
    store: &S,
    tx_time: DateTime<Utc>,
    wage: WageRecord,
    seen: &mut BTreeSet<String>,
) -> Result<WageRecord, LedgerError> {
    let wage = wage.with_default_timestamp(tx_time);
    wage.validate()?;
    if !seen.insert(wage.wage_id.clone()) || store.wage_row_exists(&wage.wage_id)? {
        return Err(LedgerError::Duplicate {
            kind: "wage",
            id: wage.wage_id,
        });
    }
    Ok(wage)
}

fn prepare_batch<S: StateStore + ?Sized>(
    store: &S,
    tx_time: DateTime<Utc>,
    wages: Vec<WageRecord>,
    max_batch_size: usize,
) -> Result<Vec<WageRecord>, LedgerError> {
    if wages.is_empty() {
        return Err(LedgerError::invalid("wages", "batch must not be empty"));
    }
    if wages.len() > max_batch_size {
        return Err(LedgerError::invalid("wages", "batch exceeds maximum size"));
    }
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(wages.len());
    for (index, wage) in wages.into_iter().enumerate() {
        match prepare_wage(store, tx_time, wage, &mut seen) {
            Ok(w) => out.push(w),
            Err(e) => {
                warn!(index, error = %e, "batch item rejected");
                return Err(e);
            }
        }
    }
    Ok(out)
}

impl TracientLedger {
    /// Records one wage. An empty timestamp takes the transaction time.
    pub fn record_wage<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        wage: WageRecord,
    ) -> Result<WageRecord, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::RECORD_WAGE);
        let wage_id = wage.wage_id.clone();
        let caller = tx.gate(&self.policy, &wage_id, WAGE_TARGET, None)?;
        tx.record_decision(
            AuditEventType::AccessGranted,
            &wage_id,
            WAGE_TARGET,
            AuditStatus::Success,
            format!("role {}", caller.role),
        )?;

        let tx_time = tx.store.tx_timestamp();
        let prepared = prepare_wage(&*tx.store, tx_time, wage, &mut BTreeSet::new());
        let wage = tx.audited(AuditEventType::DataWrite, &wage_id, WAGE_TARGET, prepared)?;
        let written = tx.store.insert_wage_row(&wage).map_err(LedgerError::from);
        tx.audited(AuditEventType::DataWrite, &wage_id, WAGE_TARGET, written)?;

        tx.notify(events::WAGE_RECORDED, &wage);
        tx.record_decision(
            AuditEventType::DataWrite,
            &wage_id,
            WAGE_TARGET,
            AuditStatus::Success,
            format!("amount {} {}", wage.amount, wage.currency),
        )?;
        info!(wage_id = %wage_id, worker = %wage.worker_id_hash, "wage recorded");
        Ok(wage)
    }

    /// All-or-nothing: every item is validated (including duplicate ids
    /// against the store and within the batch) before the first write.
    pub fn batch_record_wages<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        wages: Vec<WageRecord>,
    ) -> Result<Vec<String>, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::BATCH_RECORD_WAGES);
        let target = format!("batch:{}", wages.len());
        let caller = tx.gate(&self.policy, &target, WAGE_TARGET, None)?;
        tx.record_decision(
            AuditEventType::AccessGranted,
            &target,
            WAGE_TARGET,
            AuditStatus::Success,
            format!("role {}", caller.role),
        )?;

        let tx_time = tx.store.tx_timestamp();
        let prepared = prepare_batch(&*tx.store, tx_time, wages, self.config.max_batch_size);
        let prepared = tx.audited(AuditEventType::DataWrite, &target, WAGE_TARGET, prepared)?;
        for wage in &prepared {
            let written = tx.store.insert_wage_row(wage).map_err(LedgerError::from);
            tx.audited(AuditEventType::DataWrite, &wage.wage_id, WAGE_TARGET, written)?;
        }

        let wage_ids: Vec<String> = prepared.into_iter().map(|w| w.wage_id).collect();
        tx.notify(
            events::WAGE_BATCH_RECORDED,
            &WageBatchRecorded {
                count: wage_ids.len(),
                wage_ids: &wage_ids,
            },
        );
        tx.record_decision(
            AuditEventType::DataWrite,
            &target,
            WAGE_TARGET,
            AuditStatus::Success,
            format!("recorded {} wages", wage_ids.len()),
        )?;
        info!(count = wage_ids.len(), "wage batch recorded");
        Ok(wage_ids)
    }

    /// A missing id is still audited as a successful read.
    pub fn read_wage<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        wage_id: &str,
    ) -> Result<WageRecord, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::READ_WAGE);
        tx.gate(&self.policy, wage_id, WAGE_TARGET, None)?;

        let found = tx.store.wage_row(wage_id).map_err(LedgerError::from);
        let found = tx.audited(AuditEventType::DataRead, wage_id, WAGE_TARGET, found)?;
        tx.record_decision(
            AuditEventType::DataRead,
            wage_id,
            WAGE_TARGET,
            AuditStatus::Success,
            if found.is_some() { "found" } else { "not found" },
        )?;
        found.ok_or_else(|| LedgerError::not_found("wage", wage_id))
    }

    pub fn wage_exists<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        wage_id: &str,
    ) -> Result<bool, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::WAGE_EXISTS);
        tx.gate(&self.policy, wage_id, WAGE_TARGET, None)?;

        let exists = tx.store.wage_row_exists(wage_id).map_err(LedgerError::from);
        let exists = tx.audited(AuditEventType::DataRead, wage_id, WAGE_TARGET, exists)?;
        tx.record_decision(
            AuditEventType::DataRead,
            wage_id,
            WAGE_TARGET,
            AuditStatus::Success,
            format!("exists: {exists}"),
        )?;
        Ok(exists)
    }

    pub fn query_wages_by_worker<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        worker_id_hash: &str,
    ) -> Result<Vec<WageRecord>, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::QUERY_WAGES_BY_WORKER);
        tx.gate(&self.policy, worker_id_hash, WORKER_TARGET, Some(worker_id_hash))?;

        let wages = scan_wages(&*tx.store, "worker_id_hash", worker_id_hash);
        let wages = tx.audited(AuditEventType::DataRead, worker_id_hash, WORKER_TARGET, wages)?;
        let out: Vec<WageRecord> = wages
            .into_iter()
            .filter(|w| w.worker_id_hash == worker_id_hash)
            .collect();
        tx.record_decision(
            AuditEventType::DataRead,
            worker_id_hash,
            WORKER_TARGET,
            AuditStatus::Success,
            format!("returned {} wages", out.len()),
        )?;
        Ok(out)
    }

    pub fn query_wages_by_employer<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        employer_id_hash: &str,
    ) -> Result<Vec<WageRecord>, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::QUERY_WAGES_BY_EMPLOYER);
        tx.gate(
            &self.policy,
            employer_id_hash,
            EMPLOYER_TARGET,
            Some(employer_id_hash),
        )?;

        let wages = scan_wages(&*tx.store, "employer_id_hash", employer_id_hash);
        let wages = tx.audited(
            AuditEventType::DataRead,
            employer_id_hash,
            EMPLOYER_TARGET,
            wages,
        )?;
        let out: Vec<WageRecord> = wages
            .into_iter()
            .filter(|w| w.employer_id_hash == employer_id_hash)
            .collect();
        tx.record_decision(
            AuditEventType::DataRead,
            employer_id_hash,
            EMPLOYER_TARGET,
            AuditStatus::Success,
            format!("returned {} wages", out.len()),
        )?;
        Ok(out)
    }

    /// Zero, not an error, when nothing matches.
    pub fn calculate_total_income<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        worker_id_hash: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Decimal, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::CALCULATE_TOTAL_INCOME);
        tx.gate(&self.policy, worker_id_hash, WORKER_TARGET, Some(worker_id_hash))?;

        let range = DateRange::parse(start_date, end_date).map_err(LedgerError::from);
        let range = tx.audited(AuditEventType::DataRead, worker_id_hash, WORKER_TARGET, range)?;
        let wages = scan_wages(&*tx.store, "worker_id_hash", worker_id_hash);
        let wages = tx.audited(AuditEventType::DataRead, worker_id_hash, WORKER_TARGET, wages)?;
        let total = total_income(&wages, worker_id_hash, &range);

        tx.record_decision(
            AuditEventType::DataRead,
            worker_id_hash,
            WORKER_TARGET,
            AuditStatus::Success,
            format!("total income {total}"),
        )?;
        Ok(total)
    }

    pub fn get_worker_income_history<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        worker_id_hash: &str,
        months: usize,
    ) -> Result<Vec<MonthlyIncome>, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::GET_WORKER_INCOME_HISTORY);
        tx.gate(&self.policy, worker_id_hash, WORKER_TARGET, Some(worker_id_hash))?;

        let wages = scan_wages(&*tx.store, "worker_id_hash", worker_id_hash);
        let wages = tx.audited(AuditEventType::DataRead, worker_id_hash, WORKER_TARGET, wages)?;
        let months = if months == 0 {
            self.config.history_default_months
        } else {
            months
        };
        let history = monthly_income_history(&wages, worker_id_hash, months);

        tx.record_decision(
            AuditEventType::DataRead,
            worker_id_hash,
            WORKER_TARGET,
            AuditStatus::Success,
            format!("returned {} months", history.len()),
        )?;
        Ok(history)
    }
}

fn scan_wages<S: StateStore + ?Sized>(
    store: &S,
    field: &'static str,
    id_hash: &str,
) -> Result<Vec<WageRecord>, LedgerError> {
    validate_id(field, id_hash, 256)?;
    Ok(store.wage_rows()?)
}
