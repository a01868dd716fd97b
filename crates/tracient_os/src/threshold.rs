#![forbid(unsafe_code)]

use rust_decimal::Decimal;
use tracing::info;
use tracient_engines::income::{classify_poverty, period_label, total_income};
use tracient_kernel_contracts::audit::{AuditEventType, AuditStatus};
use tracient_kernel_contracts::common::validate_id;
use tracient_kernel_contracts::threshold::{PovertyCategory, PovertyStatusResult, PovertyThreshold};
use tracient_kernel_contracts::{ops, DateRange};
use tracient_storage::repo::{ThresholdRepo, WageRepo};
use tracient_storage::{StateStore, StorageError};

use crate::error::LedgerError;
use crate::ledger::{events, TracientLedger};
use crate::tx::LedgerTx;

const THRESHOLD_TARGET: &str = "threshold";
const WORKER_TARGET: &str = "worker";
const LEDGER_TARGET: &str = "ledger";

fn parse_category(category: &str) -> Result<PovertyCategory, LedgerError> {
    PovertyCategory::parse(category)
        .ok_or_else(|| LedgerError::invalid("category", "must be BPL or APL"))
}

/// Region-specific value first, then the default region.
fn lookup_threshold<S: StateStore + ?Sized>(
    store: &S,
    region: &str,
    category: PovertyCategory,
    default_region: &str,
) -> Result<Option<PovertyThreshold>, StorageError> {
    if let Some(t) = store.threshold_row(region, category)? {
        return Ok(Some(t));
    }
    if region != default_region {
        return store.threshold_row(default_region, category);
    }
    Ok(None)
}

impl TracientLedger {
    fn region_or_default<'a>(&'a self, region: &'a str) -> &'a str {
        if region.trim().is_empty() {
            &self.config.default_region
        } else {
            region
        }
    }

    /// Seeds the default-region thresholds from configuration.
    pub fn init_ledger<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
    ) -> Result<Vec<PovertyThreshold>, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::INIT_LEDGER);
        let caller = tx.gate(&self.policy, LEDGER_TARGET, LEDGER_TARGET, None)?;
        tx.record_decision(
            AuditEventType::AccessGranted,
            LEDGER_TARGET,
            LEDGER_TARGET,
            AuditStatus::Success,
            format!("role {}", caller.role),
        )?;

        let seeded_at = tx.store.tx_timestamp().to_rfc3339();
        let seeds: Result<Vec<PovertyThreshold>, LedgerError> = self
            .config
            .seed_thresholds
            .iter()
            .map(|seed| {
                Ok(PovertyThreshold::v1(
                    self.config.default_region.as_str(),
                    seed.category,
                    seed.amount,
                    caller.id.as_str(),
                    seeded_at.as_str(),
                )?)
            })
            .collect();
        let seeds = tx.audited(AuditEventType::LedgerInitialized, LEDGER_TARGET, LEDGER_TARGET, seeds)?;
        for t in &seeds {
            let written = tx.store.put_threshold_row(t).map_err(LedgerError::from);
            tx.audited(AuditEventType::LedgerInitialized, LEDGER_TARGET, LEDGER_TARGET, written)?;
        }

        tx.record_decision(
            AuditEventType::LedgerInitialized,
            LEDGER_TARGET,
            LEDGER_TARGET,
            AuditStatus::Success,
            format!("seeded {} thresholds", seeds.len()),
        )?;
        info!(count = seeds.len(), "ledger initialized");
        Ok(seeds)
    }

    /// Last write wins for a (region, category) pair.
    pub fn set_poverty_threshold<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        region: &str,
        category: &str,
        amount: Decimal,
        set_by: &str,
    ) -> Result<PovertyThreshold, LedgerError> {
        let region = self.region_or_default(region);
        let target = format!("{region}_{category}");
        let mut tx = LedgerTx::begin(store, ops::SET_POVERTY_THRESHOLD);
        let caller = tx.gate(&self.policy, &target, THRESHOLD_TARGET, None)?;
        tx.record_decision(
            AuditEventType::AccessGranted,
            &target,
            THRESHOLD_TARGET,
            AuditStatus::Success,
            format!("role {}", caller.role),
        )?;

        let updated_at = tx.store.tx_timestamp().to_rfc3339();
        let threshold = parse_category(category).and_then(|c| {
            Ok(PovertyThreshold::v1(region, c, amount, set_by, updated_at)?)
        });
        let threshold = tx.audited(AuditEventType::ThresholdChanged, &target, THRESHOLD_TARGET, threshold)?;
        let previous = tx
            .store
            .threshold_row(region, threshold.category)
            .map_err(LedgerError::from);
        let previous = tx.audited(AuditEventType::ThresholdChanged, &target, THRESHOLD_TARGET, previous)?;
        let written = tx.store.put_threshold_row(&threshold).map_err(LedgerError::from);
        tx.audited(AuditEventType::ThresholdChanged, &target, THRESHOLD_TARGET, written)?;

        tx.notify(events::POVERTY_THRESHOLD_UPDATED, &threshold);
        let details = match previous {
            Some(p) => format!("{} -> {} by {set_by}", p.amount, threshold.amount),
            None => format!("set to {} by {set_by}", threshold.amount),
        };
        tx.record_decision(
            AuditEventType::ThresholdChanged,
            &target,
            THRESHOLD_TARGET,
            AuditStatus::Success,
            details,
        )?;
        info!(region, category = threshold.category.as_str(), amount = %threshold.amount, "poverty threshold set");
        Ok(threshold)
    }

    pub fn get_poverty_threshold<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        region: &str,
        category: &str,
    ) -> Result<PovertyThreshold, LedgerError> {
        let region = self.region_or_default(region);
        let target = format!("{region}_{category}");
        let mut tx = LedgerTx::begin(store, ops::GET_POVERTY_THRESHOLD);
        tx.gate(&self.policy, &target, THRESHOLD_TARGET, None)?;

        let category = parse_category(category);
        let category = tx.audited(AuditEventType::DataRead, &target, THRESHOLD_TARGET, category)?;
        let found = lookup_threshold(&*tx.store, region, category, &self.config.default_region)
            .map_err(LedgerError::from);
        let found = tx.audited(AuditEventType::DataRead, &target, THRESHOLD_TARGET, found)?;
        tx.record_decision(
            AuditEventType::DataRead,
            &target,
            THRESHOLD_TARGET,
            AuditStatus::Success,
            match &found {
                Some(t) => format!("resolved from region {}", t.region),
                None => "not found".to_string(),
            },
        )?;
        found.ok_or_else(|| LedgerError::not_found("threshold", target))
    }

    /// BPL when income is strictly below the BPL line for the region.
    pub fn check_poverty_status<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        worker_id_hash: &str,
        region: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<PovertyStatusResult, LedgerError> {
        let region = self.region_or_default(region);
        let mut tx = LedgerTx::begin(store, ops::CHECK_POVERTY_STATUS);
        tx.gate(&self.policy, worker_id_hash, WORKER_TARGET, Some(worker_id_hash))?;

        let range = validate_id("worker_id_hash", worker_id_hash, 256)
            .map_err(LedgerError::from)
            .and_then(|()| DateRange::parse(start_date, end_date).map_err(LedgerError::from));
        let range = tx.audited(AuditEventType::DataRead, worker_id_hash, WORKER_TARGET, range)?;
        let wages = tx.store.wage_rows().map_err(LedgerError::from);
        let wages = tx.audited(AuditEventType::DataRead, worker_id_hash, WORKER_TARGET, wages)?;
        let threshold = lookup_threshold(
            &*tx.store,
            region,
            PovertyCategory::Bpl,
            &self.config.default_region,
        )
        .map_err(LedgerError::from);
        let threshold = tx
            .audited(AuditEventType::DataRead, worker_id_hash, WORKER_TARGET, threshold)?
            .map(|t| t.amount)
            .unwrap_or(self.config.fallback_bpl_threshold);

        let income = total_income(&wages, worker_id_hash, &range);
        let result = PovertyStatusResult {
            worker_id_hash: worker_id_hash.to_string(),
            status: classify_poverty(income, threshold),
            total_income: income,
            threshold,
            region: region.to_string(),
            period: period_label(start_date, end_date),
        };

        tx.notify(events::POVERTY_STATUS_CHECKED, &result);
        tx.record_decision(
            AuditEventType::DataRead,
            worker_id_hash,
            WORKER_TARGET,
            AuditStatus::Success,
            format!("income {income} against threshold {threshold}"),
        )?;
        Ok(result)
    }
}
