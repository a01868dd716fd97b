#![forbid(unsafe_code)]

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tracient_engines::access::AccessPolicyConfig;
use tracient_engines::identity::CallerCredential;
use tracient_kernel_contracts::access::{DenyReason, Role};
use tracient_kernel_contracts::audit::AuditStatus;
use tracient_kernel_contracts::wage::WageRecord;
use tracient_os::{events, LedgerConfig, LedgerError, TracientLedger};
use tracient_storage::repo::{AuditRepo, WageRepo};
use tracient_storage::{MemoryStateStore, StateStore};

fn tx_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
}

fn credential(id: &str, role: Role, clearance: u8) -> String {
    CallerCredential::new(id, "Org1MSP")
        .with_role(role)
        .with_clearance(clearance)
        .with_id_hash(id)
        .encode()
}

fn employer() -> String {
    credential("employer-001", Role::Employer, 6)
}

fn worker() -> String {
    credential("worker-001", Role::Worker, 2)
}

fn as_caller(s: &mut MemoryStateStore, tx_id: &str, cred: String) {
    s.begin_transaction(tx_id, tx_time(), Some(cred));
}

fn wage_for(id: &str, worker: &str, amount: i64, ts: &str) -> WageRecord {
    WageRecord::v1(
        id,
        worker,
        "employer-001",
        Decimal::new(amount, 0),
        "INR",
        "construction",
        ts,
        "v1",
    )
    .unwrap()
}

fn wage(id: &str, amount: i64, ts: &str) -> WageRecord {
    wage_for(id, "worker-001", amount, ts)
}

fn args(a: &[&str]) -> Vec<String> {
    a.iter().map(|s| s.to_string()).collect()
}

#[test]
fn at_wage_01_recorded_wage_reads_back_and_notifies() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    as_caller(&mut s, "tx-1", employer());
    let recorded = ledger
        .record_wage(&mut s, wage("WAGE001", 5000, "2024-01-10T09:00:00Z"))
        .unwrap();

    as_caller(&mut s, "tx-2", worker());
    assert_eq!(ledger.read_wage(&mut s, "WAGE001").unwrap(), recorded);
    assert!(ledger.wage_exists(&mut s, "WAGE001").unwrap());
    assert!(!ledger.wage_exists(&mut s, "WAGE404").unwrap());

    let notes = s.events_named(events::WAGE_RECORDED);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].tx_id, "tx-1");
    let payload: WageRecord = serde_json::from_slice(&notes[0].payload).unwrap();
    assert_eq!(payload, recorded);
}

#[test]
fn at_wage_02_duplicate_id_is_rejected_without_state_change() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    as_caller(&mut s, "tx-1", employer());
    ledger
        .record_wage(&mut s, wage("WAGE001", 5000, "2024-01-10T09:00:00Z"))
        .unwrap();

    as_caller(&mut s, "tx-2", employer());
    let err = ledger
        .record_wage(&mut s, wage("WAGE001", 9999, "2024-01-11T09:00:00Z"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Duplicate { kind: "wage", .. }));

    let stored = s.wage_row("WAGE001").unwrap().unwrap();
    assert_eq!(stored.amount, Decimal::new(5000, 0));
    assert_eq!(s.keys_with_prefix("WAGE_").len(), 1);
    assert_eq!(s.events_named(events::WAGE_RECORDED).len(), 1);

    let failures = s
        .audit_rows()
        .unwrap()
        .into_iter()
        .filter(|e| e.function == "RecordWage" && e.status == AuditStatus::Error)
        .count();
    assert_eq!(failures, 1);
}

#[test]
fn at_wage_03_total_income_sums_exactly_through_dispatch() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    as_caller(&mut s, "tx-1", employer());
    for (id, amount, ts) in [
        ("WAGE001", "5000", "2024-01-10T09:00:00Z"),
        ("WAGE002", "3000", "2024-01-20T09:00:00Z"),
        ("WAGE003", "700", "2024-02-02T09:00:00Z"),
    ] {
        ledger
            .invoke(
                &mut s,
                "RecordWage",
                &args(&[id, "worker-001", "employer-001", amount, "INR", "farm", ts, "v1"]),
            )
            .unwrap();
    }

    as_caller(&mut s, "tx-2", worker());
    let total = ledger
        .invoke(
            &mut s,
            "CalculateTotalIncome",
            &args(&["worker-001", "2024-01-01", "2024-01-31"]),
        )
        .unwrap();
    let total: Decimal = serde_json::from_value(total).unwrap();
    assert_eq!(total, Decimal::new(8000, 0));

    let all = ledger
        .calculate_total_income(&mut s, "worker-001", "", "")
        .unwrap();
    assert_eq!(all, Decimal::new(8700, 0));

    let none = ledger
        .calculate_total_income(&mut s, "worker-001", "2023-01-01", "2023-12-31")
        .unwrap();
    assert_eq!(none, Decimal::ZERO);
}

#[test]
fn at_wage_04_empty_timestamp_takes_transaction_time() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    as_caller(&mut s, "tx-1", employer());
    ledger
        .invoke(
            &mut s,
            "RecordWage",
            &args(&["WAGE001", "worker-001", "employer-001", "120.50", "INR", "", "", ""]),
        )
        .unwrap();
    let stored = s.wage_row("WAGE001").unwrap().unwrap();
    assert_eq!(stored.occurred_at(), Some(tx_time()));
    assert_eq!(stored.amount, Decimal::new(12050, 2));
}

#[test]
fn at_wage_05_batch_is_all_or_nothing() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    as_caller(&mut s, "tx-1", employer());
    ledger
        .record_wage(&mut s, wage("WAGE001", 5000, "2024-01-10T09:00:00Z"))
        .unwrap();

    let repeated_in_batch = vec![
        wage("WAGE010", 100, "2024-01-10T09:00:00Z"),
        wage("WAGE011", 100, "2024-01-10T09:00:00Z"),
        wage("WAGE010", 100, "2024-01-10T09:00:00Z"),
    ];
    as_caller(&mut s, "tx-2", employer());
    let err = ledger.batch_record_wages(&mut s, repeated_in_batch).unwrap_err();
    assert!(matches!(err, LedgerError::Duplicate { .. }));

    let already_stored = vec![
        wage("WAGE020", 100, "2024-01-10T09:00:00Z"),
        wage("WAGE001", 100, "2024-01-10T09:00:00Z"),
    ];
    as_caller(&mut s, "tx-3", employer());
    let err = ledger.batch_record_wages(&mut s, already_stored).unwrap_err();
    assert!(matches!(err, LedgerError::Duplicate { .. }));

    let mut zero = wage("WAGE031", 100, "2024-01-10T09:00:00Z");
    zero.amount = Decimal::ZERO;
    let invalid_last = vec![wage("WAGE030", 100, "2024-01-10T09:00:00Z"), zero];
    as_caller(&mut s, "tx-4", employer());
    let err = ledger.batch_record_wages(&mut s, invalid_last).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    as_caller(&mut s, "tx-5", employer());
    let err = ledger.batch_record_wages(&mut s, Vec::new()).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    assert_eq!(s.keys_with_prefix("WAGE_"), vec!["WAGE_WAGE001".to_string()]);
    assert!(s.events_named(events::WAGE_BATCH_RECORDED).is_empty());

    let good = serde_json::to_string(&vec![
        wage("WAGE040", 100, "2024-01-10T09:00:00Z"),
        wage("WAGE041", 200, "2024-01-11T09:00:00Z"),
    ])
    .unwrap();
    as_caller(&mut s, "tx-6", employer());
    let ids = ledger
        .invoke(&mut s, "BatchRecordWages", &[good])
        .unwrap();
    assert_eq!(ids, serde_json::json!(["WAGE040", "WAGE041"]));
    assert_eq!(s.keys_with_prefix("WAGE_").len(), 3);

    let notes = s.events_named(events::WAGE_BATCH_RECORDED);
    assert_eq!(notes.len(), 1);
    let payload: serde_json::Value = serde_json::from_slice(&notes[0].payload).unwrap();
    assert_eq!(payload["count"], 2);
    assert_eq!(payload["wageIds"], serde_json::json!(["WAGE040", "WAGE041"]));
}

#[test]
fn at_wage_06_worker_reads_own_wages_only() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    as_caller(&mut s, "tx-1", employer());
    ledger
        .record_wage(&mut s, wage("WAGE001", 5000, "2024-01-10T09:00:00Z"))
        .unwrap();
    ledger
        .record_wage(
            &mut s,
            wage_for("WAGE002", "worker-002", 4000, "2024-01-10T09:00:00Z"),
        )
        .unwrap();

    as_caller(&mut s, "tx-2", worker());
    let own = ledger.query_wages_by_worker(&mut s, "worker-001").unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].wage_id, "WAGE001");

    as_caller(&mut s, "tx-3", worker());
    let err = ledger
        .query_wages_by_worker(&mut s, "worker-002")
        .unwrap_err();
    assert_eq!(err.deny_reason(), Some(DenyReason::SelfAccess));

    let denied = s
        .audit_rows()
        .unwrap()
        .into_iter()
        .filter(|e| {
            e.function == "QueryWagesByWorker"
                && e.status == AuditStatus::Denied
                && e.target_id == "worker-002"
        })
        .count();
    assert_eq!(denied, 1);
}

#[test]
fn at_wage_07_malformed_records_are_skipped_by_scans() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    as_caller(&mut s, "tx-1", employer());
    ledger
        .record_wage(&mut s, wage("WAGE001", 5000, "2024-01-10T09:00:00Z"))
        .unwrap();
    s.put("WAGE_BROKEN", b"{not json".to_vec()).unwrap();

    as_caller(&mut s, "tx-2", worker());
    let own = ledger.query_wages_by_worker(&mut s, "worker-001").unwrap();
    assert_eq!(own.len(), 1);
    let total = ledger
        .calculate_total_income(&mut s, "worker-001", "", "")
        .unwrap();
    assert_eq!(total, Decimal::new(5000, 0));
}

#[test]
fn at_wage_08_income_history_is_newest_month_first() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    as_caller(&mut s, "tx-1", employer());
    for w in [
        wage("WAGE001", 5000, "2024-01-10T09:00:00Z"),
        wage("WAGE002", 3000, "2024-01-20T09:00:00Z"),
        wage("WAGE003", 1000, "2024-02-05T09:00:00Z"),
    ] {
        ledger.record_wage(&mut s, w).unwrap();
    }

    as_caller(&mut s, "tx-2", worker());
    let history = ledger
        .get_worker_income_history(&mut s, "worker-001", 0)
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].month, "2024-02");
    assert_eq!(history[0].total_income, Decimal::new(1000, 0));
    assert_eq!(history[1].month, "2024-01");
    assert_eq!(history[1].total_income, Decimal::new(8000, 0));
    assert_eq!(history[1].wage_count, 2);

    let latest = ledger
        .get_worker_income_history(&mut s, "worker-001", 1)
        .unwrap();
    assert_eq!(latest.len(), 1);

    let short_window = TracientLedger::new(
        AccessPolicyConfig::tracient_v1(),
        LedgerConfig {
            history_default_months: 1,
            ..LedgerConfig::mvp_v1()
        },
    );
    let default_window = short_window
        .get_worker_income_history(&mut s, "worker-001", 0)
        .unwrap();
    assert_eq!(default_window.len(), 1);
    assert_eq!(default_window[0].month, "2024-02");
}

#[test]
fn at_wage_09_missing_wage_read_is_audited_as_success() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    as_caller(&mut s, "tx-1", worker());
    let err = ledger.read_wage(&mut s, "WAGE404").unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { kind: "wage", .. }));

    let rows = s.audit_rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].function, "ReadWage");
    assert_eq!(rows[0].status, AuditStatus::Success);
    assert_eq!(rows[0].target_id, "WAGE404");
}
