#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};
use tracient_kernel_contracts::audit::{
    AuditEventInput, AuditEventType, AuditLogEntry, AuditStatus, RiskLevel,
};
use tracient_storage::audit::{verify_entry_digest, AuditWriter, HIGH_RISK_ACTIVITY_EVENT};
use tracient_storage::repo::AuditRepo;
use tracient_storage::{MemoryStateStore, StorageError};

fn input(event_type: AuditEventType, risk: RiskLevel) -> AuditEventInput {
    AuditEventInput::v1(
        event_type,
        "RecordWage",
        "employer-001",
        "employer-001",
        "Org1MSP",
        "employer",
        "WAGE001",
        "wage",
        AuditStatus::Success,
        risk,
        "",
    )
    .unwrap()
}

fn store_at_tx(tx_id: &str) -> MemoryStateStore {
    let mut s = MemoryStateStore::new_in_memory();
    s.begin_transaction(
        tx_id,
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
        None,
    );
    s
}

#[test]
fn at_audit_01_entries_in_one_transaction_get_distinct_keys() {
    let mut s = store_at_tx("tx-abc");
    let mut w = AuditWriter::new();
    let a = w
        .emit(&mut s, input(AuditEventType::AccessGranted, RiskLevel::Medium))
        .unwrap();
    let b = w
        .emit(&mut s, input(AuditEventType::DataWrite, RiskLevel::Medium))
        .unwrap();
    assert_ne!(a.log_id, b.log_id);
    assert!(a.log_id < b.log_id);
    assert_eq!(s.audit_rows().unwrap(), vec![a, b]);
}

#[test]
fn at_audit_02_fresh_writer_never_overwrites_existing_entries() {
    let mut s = store_at_tx("tx-abc");
    let first = AuditWriter::new()
        .emit(&mut s, input(AuditEventType::AccessGranted, RiskLevel::Low))
        .unwrap();
    let second = AuditWriter::new()
        .emit(&mut s, input(AuditEventType::DataRead, RiskLevel::Low))
        .unwrap();

    let rows = s.audit_rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], first);
    assert_eq!(rows[1], second);
    let ids: BTreeSet<&str> = rows.iter().map(|e| e.log_id.as_str()).collect();
    assert_eq!(ids.len(), 2);
}

#[test]
fn at_audit_03_append_only_rejects_rewrite_of_a_key() {
    let mut s = store_at_tx("tx-abc");
    let e = AuditWriter::new()
        .emit(&mut s, input(AuditEventType::DataRead, RiskLevel::Low))
        .unwrap();
    let mut forged: AuditLogEntry = e.clone();
    forged.details = "tampered".to_string();
    let err = s.append_audit_row(&e.log_id, &forged).unwrap_err();
    assert!(matches!(err, StorageError::AppendOnlyViolation { .. }));
    assert_eq!(s.audit_rows().unwrap(), vec![e]);
}

#[test]
fn at_audit_04_entry_digest_detects_tampering() {
    let mut s = store_at_tx("tx-abc");
    let e = AuditWriter::new()
        .emit(&mut s, input(AuditEventType::DataRead, RiskLevel::Low))
        .unwrap();
    assert_eq!(e.entry_hash.len(), 64);
    assert!(verify_entry_digest(&e));
    let mut changed = e.clone();
    changed.status = AuditStatus::Denied;
    assert!(!verify_entry_digest(&changed));
}

#[test]
fn at_audit_05_high_and_critical_entries_raise_notifications() {
    let mut s = store_at_tx("tx-abc");
    let mut w = AuditWriter::new();
    w.emit(&mut s, input(AuditEventType::DataRead, RiskLevel::Medium))
        .unwrap();
    let high = w
        .emit(&mut s, input(AuditEventType::AccessDenied, RiskLevel::High))
        .unwrap();
    w.emit(&mut s, input(AuditEventType::AccessDenied, RiskLevel::Critical))
        .unwrap();

    let notices = s.events_named(HIGH_RISK_ACTIVITY_EVENT);
    assert_eq!(notices.len(), 2);
    let payload: serde_json::Value = serde_json::from_slice(&notices[0].payload).unwrap();
    assert_eq!(payload["logId"], high.log_id.as_str());
    assert_eq!(payload["riskLevel"], "high");
    assert_eq!(payload["eventType"], "ACCESS_DENIED");
}

#[test]
fn at_audit_06_entry_carries_transaction_time_and_id() {
    let mut s = store_at_tx("tx-xyz");
    let e = AuditWriter::new()
        .emit(&mut s, input(AuditEventType::DataRead, RiskLevel::Low))
        .unwrap();
    assert_eq!(e.tx_id, "tx-xyz");
    assert_eq!(e.timestamp, "2024-01-15T10:00:00.000000000Z");
    assert_eq!(
        e.occurred_at(),
        Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap())
    );
    assert!(e.log_id.starts_with("AUDIT_20240115100000.000000000_tx-xyz_"));
}
