#![forbid(unsafe_code)]

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use tracient_kernel_contracts::access::{PermissionSet, Role};
use tracient_kernel_contracts::anomaly::AnomalyFlag;
use tracient_kernel_contracts::identity::IdentityRecord;
use tracient_kernel_contracts::threshold::{PovertyCategory, PovertyThreshold};
use tracient_kernel_contracts::wage::WageRecord;
use tracient_storage::keys::{wage_key, USER_PREFIX, WAGE_PREFIX};
use tracient_storage::repo::{scan_rows, AnomalyRepo, IdentityRepo, ThresholdRepo, WageRepo};
use tracient_storage::{MemoryStateStore, StateStore, StorageError};

fn store() -> MemoryStateStore {
    let mut s = MemoryStateStore::new_in_memory();
    s.begin_transaction(
        "dbw_tx_1",
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
        None,
    );
    s
}

fn wage(id: &str, worker: &str, amount: i64) -> WageRecord {
    WageRecord::v1(
        id,
        worker,
        "employer-001",
        Decimal::new(amount, 0),
        "INR",
        "construction",
        "2024-01-15T10:00:00Z",
        "v1",
    )
    .unwrap()
}

#[test]
fn at_tables_01_wage_insert_rejects_duplicate_id() {
    let mut s = store();
    s.insert_wage_row(&wage("WAGE001", "worker-001", 5000)).unwrap();
    let before = s.wage_row("WAGE001").unwrap();

    let err = s
        .insert_wage_row(&wage("WAGE001", "worker-002", 9999))
        .unwrap_err();
    assert!(matches!(err, StorageError::DuplicateKey { table: "wages", .. }));
    assert_eq!(s.wage_row("WAGE001").unwrap(), before);
    assert!(s.wage_row_exists("WAGE001").unwrap());
    assert!(!s.wage_row_exists("WAGE404").unwrap());
}

#[test]
fn at_tables_02_scan_skips_malformed_rows() {
    let mut s = store();
    s.insert_wage_row(&wage("WAGE001", "worker-001", 5000)).unwrap();
    s.put(&wage_key("WAGE002"), b"{not json".to_vec()).unwrap();
    s.insert_wage_row(&wage("WAGE003", "worker-001", 3000)).unwrap();

    let rows = s.wage_rows().unwrap();
    let ids: Vec<&str> = rows.iter().map(|w| w.wage_id.as_str()).collect();
    assert_eq!(ids, vec!["WAGE001", "WAGE003"]);

    let err = s.wage_row("WAGE002").unwrap_err();
    assert!(matches!(err, StorageError::Codec { .. }));
}

#[test]
fn at_tables_03_prefix_scan_stays_inside_its_table() {
    let mut s = store();
    s.insert_wage_row(&wage("WAGE001", "worker-001", 5000)).unwrap();
    let user = IdentityRecord::v1(
        "user-1",
        "worker-001",
        "Asha",
        "c1",
        Role::Worker,
        "Org1MSP",
        2,
        PermissionSet::new(),
        "2024-01-15T10:00:00+00:00",
    )
    .unwrap();
    s.insert_identity_row(&user).unwrap();

    let wages: Vec<WageRecord> = scan_rows(&s, WAGE_PREFIX).unwrap();
    assert_eq!(wages.len(), 1);
    let users: Vec<IdentityRecord> = scan_rows(&s, USER_PREFIX).unwrap();
    assert_eq!(users, vec![user]);
}

#[test]
fn at_tables_04_identity_update_overwrites_but_insert_does_not() {
    let mut s = store();
    let mut user = IdentityRecord::v1(
        "user-1",
        "hash-1",
        "Asha",
        "c1",
        Role::Worker,
        "Org1MSP",
        2,
        PermissionSet::new(),
        "2024-01-15T10:00:00+00:00",
    )
    .unwrap();
    s.insert_identity_row(&user).unwrap();
    assert!(s.insert_identity_row(&user).is_err());

    user.name = "Asha K".to_string();
    s.update_identity_row(&user).unwrap();
    assert_eq!(s.identity_row("hash-1").unwrap().unwrap().name, "Asha K");
    assert!(s.identity_row_exists("hash-1").unwrap());
}

#[test]
fn at_tables_05_threshold_is_last_write_wins() {
    let mut s = store();
    for amount in [30000, 32000] {
        let t = PovertyThreshold::v1(
            "Karnataka",
            PovertyCategory::Bpl,
            Decimal::new(amount, 0),
            "gov1",
            "2024-01-15T10:00:00+00:00",
        )
        .unwrap();
        s.put_threshold_row(&t).unwrap();
    }
    let got = s
        .threshold_row("Karnataka", PovertyCategory::Bpl)
        .unwrap()
        .unwrap();
    assert_eq!(got.amount, Decimal::new(32000, 0));
    assert!(s
        .threshold_row("Karnataka", PovertyCategory::Apl)
        .unwrap()
        .is_none());
}

#[test]
fn at_tables_06_anomaly_rows_scan_in_wage_id_order() {
    let mut s = store();
    for (id, score) in [("WAGE002", 0.3), ("WAGE001", 0.85)] {
        let f = AnomalyFlag::v1(id, score, "spike", "auditor1", "2024-01-15T10:00:00+00:00")
            .unwrap();
        s.put_anomaly_row(&f).unwrap();
    }
    let rows = s.anomaly_rows().unwrap();
    assert_eq!(rows[0].wage_id, "WAGE001");
    assert_eq!(rows[1].wage_id, "WAGE002");
    assert_eq!(s.anomaly_row("WAGE002").unwrap().unwrap().anomaly_score, 0.3);
}
