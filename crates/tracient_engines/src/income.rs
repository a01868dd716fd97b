#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracient_kernel_contracts::threshold::PovertyStatus;
use tracient_kernel_contracts::wage::{MonthlyIncome, WageRecord};
use tracient_kernel_contracts::DateRange;

/// A wage whose timestamp cannot be parsed only matches an unbounded range.
pub fn in_range(wage: &WageRecord, range: &DateRange) -> bool {
    match wage.occurred_at() {
        Some(t) => range.contains(t),
        None => range.start.is_none() && range.end.is_none(),
    }
}

pub fn wages_for_worker<'a>(
    wages: &'a [WageRecord],
    worker_id_hash: &'a str,
) -> impl Iterator<Item = &'a WageRecord> + 'a {
    wages.iter().filter(move |w| w.worker_id_hash == worker_id_hash)
}

/// Exact decimal sum, so the result does not depend on scan order.
pub fn total_income(wages: &[WageRecord], worker_id_hash: &str, range: &DateRange) -> Decimal {
    wages_for_worker(wages, worker_id_hash)
        .filter(|w| in_range(w, range))
        .fold(Decimal::ZERO, |acc, w| acc.saturating_add(w.amount))
}

/// `YYYY-MM` buckets, newest first, at most `months` of them. The caller
/// resolves any default window.
pub fn monthly_income_history(
    wages: &[WageRecord],
    worker_id_hash: &str,
    months: usize,
) -> Vec<MonthlyIncome> {
    let mut buckets: BTreeMap<String, (Decimal, u32)> = BTreeMap::new();
    for w in wages_for_worker(wages, worker_id_hash) {
        let Some(t) = w.occurred_at() else {
            continue;
        };
        let b = buckets
            .entry(t.format("%Y-%m").to_string())
            .or_insert((Decimal::ZERO, 0));
        b.0 = b.0.saturating_add(w.amount);
        b.1 = b.1.saturating_add(1);
    }
    buckets
        .into_iter()
        .rev()
        .take(months)
        .map(|(month, (total_income, wage_count))| MonthlyIncome {
            month,
            total_income,
            wage_count,
        })
        .collect()
}

/// Below the line is BPL; exactly on it is APL.
pub fn classify_poverty(income: Decimal, threshold: Decimal) -> PovertyStatus {
    if income < threshold {
        PovertyStatus::Bpl
    } else {
        PovertyStatus::Apl
    }
}

pub fn period_label(start: &str, end: &str) -> String {
    match (start.trim(), end.trim()) {
        ("", "") => "all-time".to_string(),
        (s, "") => format!("{s} onwards"),
        ("", e) => format!("up to {e}"),
        (s, e) => format!("{s} to {e}"),
    }
}
