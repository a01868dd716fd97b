#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use tracient_engines::identity::CallerCredential;
use tracient_kernel_contracts::access::{DenyReason, Role};
use tracient_kernel_contracts::audit::{AuditEventType, AuditQuery, AuditStatus, AuditSummary};
use tracient_kernel_contracts::wage::WageRecord;
use tracient_os::{events, RegisterUserRequest, TracientLedger};
use tracient_storage::audit::verify_entry_digest;
use tracient_storage::repo::AuditRepo;
use tracient_storage::MemoryStateStore;

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

fn auditor() -> String {
    credential("auditor-001", Role::Auditor, 6)
}

fn government() -> String {
    credential("gov1", Role::GovernmentOfficial, 9)
}

fn at(s: &mut MemoryStateStore, tx_id: &str, day: u32, hour: u32, cred: String) {
    s.begin_transaction(
        tx_id,
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap(),
        Some(cred),
    );
}

/// Seven entries over two days: two grants/writes, two denials, one read,
/// then a threshold change.
fn populate(ledger: &TracientLedger, s: &mut MemoryStateStore) {
    at(s, "tx-1", 15, 9, employer());
    let w = WageRecord::v1(
        "WAGE001",
        "worker-001",
        "employer-001",
        Decimal::new(5000, 0),
        "INR",
        "farm",
        "2024-01-10T09:00:00Z",
        "v1",
    )
    .unwrap();
    ledger.record_wage(s, w).unwrap();

    at(s, "tx-2", 15, 10, employer());
    let req = RegisterUserRequest {
        user_id: "u-7".to_string(),
        user_id_hash: "u-7-hash".to_string(),
        role: "worker".to_string(),
        organization_id: "Org1MSP".to_string(),
        name: "Meena".to_string(),
        contact_hash: String::new(),
        clearance_level: None,
    };
    assert!(ledger.register_user(s, req).is_err());

    at(s, "tx-3", 15, 11, worker());
    assert!(ledger.query_wages_by_worker(s, "worker-002").is_err());

    at(s, "tx-4", 15, 12, worker());
    ledger.calculate_total_income(s, "worker-001", "", "").unwrap();

    at(s, "tx-5", 16, 9, government());
    ledger
        .set_poverty_threshold(s, "Karnataka", "BPL", Decimal::new(32000, 0), "gov1")
        .unwrap();
}

#[test]
fn at_auditq_01_logs_are_time_ordered_with_unique_ids() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    populate(&ledger, &mut s);

    at(&mut s, "tx-q", 20, 9, auditor());
    let logs = ledger.get_audit_logs(&mut s, &AuditQuery::default()).unwrap();
    assert_eq!(logs.len(), 7);
    assert!(logs.windows(2).all(|w| w[0].occurred_at() <= w[1].occurred_at()));
    let ids: BTreeSet<&str> = logs.iter().map(|e| e.log_id.as_str()).collect();
    assert_eq!(ids.len(), logs.len());
    assert!(logs.iter().all(verify_entry_digest));

    let after = s.audit_rows().unwrap();
    let own = after.last().unwrap();
    assert_eq!(own.function, "GetAuditLogs");
    assert_eq!(own.event_type, AuditEventType::DataRead);
}

#[test]
fn at_auditq_02_query_filters_and_limits() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    populate(&ledger, &mut s);
    at(&mut s, "tx-q", 20, 9, auditor());

    let denied = ledger
        .invoke(&mut s, "GetAuditLogs", &[r#"{"status":"denied"}"#.to_string()])
        .unwrap();
    assert_eq!(denied.as_array().unwrap().len(), 2);

    let unset = ledger
        .invoke(
            &mut s,
            "GetAuditLogs",
            &[r#"{"status":"","riskLevel":""}"#.to_string()],
        )
        .unwrap();
    assert_eq!(unset.as_array().unwrap().len(), 8);
    let critical = ledger
        .invoke(
            &mut s,
            "GetAuditLogs",
            &[r#"{"status":"","riskLevel":"critical"}"#.to_string()],
        )
        .unwrap();
    assert_eq!(critical.as_array().unwrap().len(), 1);

    let by_type = AuditQuery {
        event_types: vec![AuditEventType::AccessDenied],
        ..AuditQuery::default()
    };
    assert_eq!(ledger.get_audit_logs(&mut s, &by_type).unwrap().len(), 2);

    let by_caller = AuditQuery {
        caller_id: "employer-001".to_string(),
        ..AuditQuery::default()
    };
    assert_eq!(ledger.get_audit_logs(&mut s, &by_caller).unwrap().len(), 3);

    let second_day = AuditQuery {
        start_date: "2024-01-16".to_string(),
        end_date: "2024-01-16".to_string(),
        ..AuditQuery::default()
    };
    let day = ledger.get_audit_logs(&mut s, &second_day).unwrap();
    assert_eq!(day.len(), 2);
    assert!(day.iter().all(|e| e.function == "SetPovertyThreshold"));

    let one = AuditQuery {
        limit: 1,
        ..AuditQuery::default()
    };
    let first = ledger.get_audit_logs(&mut s, &one).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].tx_id, "tx-1");

    let bad_range = AuditQuery {
        start_date: "yesterday".to_string(),
        ..AuditQuery::default()
    };
    assert!(ledger.get_audit_logs(&mut s, &bad_range).is_err());
    let errors = s
        .audit_rows()
        .unwrap()
        .into_iter()
        .filter(|e| e.function == "GetAuditLogs" && e.status == AuditStatus::Error)
        .count();
    assert_eq!(errors, 1);
}

#[test]
fn at_auditq_03_summary_counts_statuses_and_functions() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    populate(&ledger, &mut s);

    at(&mut s, "tx-q", 20, 9, auditor());
    let summary = ledger.invoke(&mut s, "GetAuditSummary", &[String::new(), String::new()]).unwrap();
    let summary: AuditSummary = serde_json::from_value(summary).unwrap();
    assert_eq!(summary.total_events, 7);
    assert_eq!(summary.success_count, 5);
    assert_eq!(summary.denied_count, 2);
    assert_eq!(summary.error_count, 0);
    assert_eq!(summary.events_by_function["RecordWage"], 2);
    assert_eq!(summary.events_by_type["ACCESS_DENIED"], 2);
    assert_eq!(summary.period, "all-time");

    at(&mut s, "tx-r", 20, 10, auditor());
    let first_day = ledger
        .get_audit_summary(&mut s, "2024-01-15", "2024-01-15")
        .unwrap();
    assert_eq!(first_day.total_events, 5);
    assert_eq!(first_day.period, "2024-01-15 to 2024-01-15");
}

#[test]
fn at_auditq_04_high_risk_events_and_notifications() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    populate(&ledger, &mut s);
    assert_eq!(s.events_named(events::HIGH_RISK_ACTIVITY).len(), 3);

    at(&mut s, "tx-q", 20, 9, auditor());
    let high = ledger.get_high_risk_events(&mut s, 0).unwrap();
    assert_eq!(high.len(), 3);
    assert_eq!(high[0].function, "RegisterUser");
    assert_eq!(high[0].risk_level.as_str(), "critical");
    assert!(high[1..].iter().all(|e| e.function == "SetPovertyThreshold"));

    let capped = ledger
        .invoke(&mut s, "GetHighRiskEvents", &["2".to_string()])
        .unwrap();
    assert_eq!(capped.as_array().unwrap().len(), 2);
}

#[test]
fn at_auditq_05_access_denials_need_management_clearance() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    populate(&ledger, &mut s);

    at(&mut s, "tx-q", 20, 9, auditor());
    let err = ledger.get_access_denials(&mut s, "", "").unwrap_err();
    assert_eq!(err.deny_reason(), Some(DenyReason::Role));

    at(&mut s, "tx-r", 20, 10, government());
    let denials = ledger.get_access_denials(&mut s, "2024-01-15", "2024-01-15").unwrap();
    assert_eq!(denials.len(), 2);
    let later = ledger.get_access_denials(&mut s, "2024-01-16", "").unwrap();
    assert!(later.iter().all(|e| e.function == "GetAccessDenials"));
    assert_eq!(later.len(), 1);
}

#[test]
fn at_auditq_06_activity_log_is_self_scoped_for_workers() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    populate(&ledger, &mut s);

    at(&mut s, "tx-q", 20, 9, worker());
    let own = ledger.get_user_activity_log(&mut s, "worker-001").unwrap();
    assert_eq!(own.len(), 2);
    assert!(own.iter().all(|e| e.caller_id_hash == "worker-001"));

    at(&mut s, "tx-r", 20, 10, worker());
    let err = ledger
        .get_user_activity_log(&mut s, "employer-001")
        .unwrap_err();
    assert_eq!(err.deny_reason(), Some(DenyReason::SelfAccess));

    at(&mut s, "tx-s", 20, 11, credential("admin-1", Role::Admin, 10));
    let employer_trail = ledger
        .get_user_activity_log(&mut s, "employer-001")
        .unwrap();
    assert_eq!(employer_trail.len(), 3);
}

#[test]
fn at_auditq_07_entries_within_one_transaction_get_distinct_keys() {
    let ledger = TracientLedger::mvp_v1();
    let mut s = MemoryStateStore::new_in_memory();
    populate(&ledger, &mut s);

    let tx1: Vec<_> = s
        .audit_rows()
        .unwrap()
        .into_iter()
        .filter(|e| e.tx_id == "tx-1")
        .collect();
    assert_eq!(tx1.len(), 2);
    assert_ne!(tx1[0].log_id, tx1[1].log_id);
    assert_eq!(tx1[0].event_type, AuditEventType::AccessGranted);
    assert_eq!(tx1[1].event_type, AuditEventType::DataWrite);
    assert!(tx1
        .iter()
        .all(|e| e.log_id.starts_with("AUDIT_20240115090000") && verify_entry_digest(e)));
    assert_eq!(tx1[0].timestamp, "2024-01-15T09:00:00.000000000Z");
}
