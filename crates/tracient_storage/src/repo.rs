#![forbid(unsafe_code)]

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;
use tracient_kernel_contracts::anomaly::AnomalyFlag;
use tracient_kernel_contracts::audit::AuditLogEntry;
use tracient_kernel_contracts::identity::IdentityRecord;
use tracient_kernel_contracts::threshold::{PovertyCategory, PovertyThreshold};
use tracient_kernel_contracts::wage::WageRecord;

use crate::keys::{
    anomaly_key, prefix_range, threshold_key, user_key, wage_key, ANOMALY_PREFIX, AUDIT_PREFIX,
    WAGE_PREFIX,
};
use crate::state::{StateStore, StorageError};

fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Codec {
        key: key.to_string(),
        detail: e.to_string(),
    })
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(value).map_err(|e| StorageError::Codec {
        key: key.to_string(),
        detail: e.to_string(),
    })
}

pub fn get_row<T, S>(store: &S, key: &str) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
    S: StateStore + ?Sized,
{
    match store.get(key)? {
        Some(bytes) => decode(key, &bytes).map(Some),
        None => Ok(None),
    }
}

pub fn put_row<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize,
    S: StateStore + ?Sized,
{
    let bytes = encode(key, value)?;
    store.put(key, bytes)
}

pub fn insert_new_row<T, S>(
    store: &mut S,
    table: &'static str,
    key: &str,
    value: &T,
) -> Result<(), StorageError>
where
    T: Serialize,
    S: StateStore + ?Sized,
{
    if store.get(key)?.is_some() {
        return Err(StorageError::DuplicateKey {
            table,
            key: key.to_string(),
        });
    }
    put_row(store, key, value)
}

/// Full prefix scan in key order. Rows that fail to decode are skipped with
/// a warning instead of failing the whole query.
pub fn scan_rows<T, S>(store: &S, prefix: &str) -> Result<Vec<T>, StorageError>
where
    T: DeserializeOwned,
    S: StateStore + ?Sized,
{
    let (start, end) = prefix_range(prefix);
    let mut rows = Vec::new();
    for (key, bytes) in store.scan_range(&start, &end)? {
        match decode::<T>(&key, &bytes) {
            Ok(row) => rows.push(row),
            Err(e) => warn!(key = %key, error = %e, "skipping malformed record"),
        }
    }
    Ok(rows)
}

/// Typed repository interface for the wage table.
pub trait WageRepo {
    fn wage_row(&self, wage_id: &str) -> Result<Option<WageRecord>, StorageError>;
    fn wage_row_exists(&self, wage_id: &str) -> Result<bool, StorageError>;
    fn insert_wage_row(&mut self, wage: &WageRecord) -> Result<(), StorageError>;
    fn wage_rows(&self) -> Result<Vec<WageRecord>, StorageError>;
}

/// Typed repository interface for registered identities.
pub trait IdentityRepo {
    fn identity_row(&self, user_id_hash: &str) -> Result<Option<IdentityRecord>, StorageError>;
    fn identity_row_exists(&self, user_id_hash: &str) -> Result<bool, StorageError>;
    fn insert_identity_row(&mut self, record: &IdentityRecord) -> Result<(), StorageError>;
    fn update_identity_row(&mut self, record: &IdentityRecord) -> Result<(), StorageError>;
}

pub trait ThresholdRepo {
    fn threshold_row(
        &self,
        region: &str,
        category: PovertyCategory,
    ) -> Result<Option<PovertyThreshold>, StorageError>;
    fn put_threshold_row(&mut self, threshold: &PovertyThreshold) -> Result<(), StorageError>;
}

pub trait AnomalyRepo {
    fn anomaly_row(&self, wage_id: &str) -> Result<Option<AnomalyFlag>, StorageError>;
    fn put_anomaly_row(&mut self, flag: &AnomalyFlag) -> Result<(), StorageError>;
    fn anomaly_rows(&self) -> Result<Vec<AnomalyFlag>, StorageError>;
}

/// Append-only audit ledger. There is no update or delete path.
pub trait AuditRepo {
    fn audit_row_exists(&self, key: &str) -> Result<bool, StorageError>;
    fn append_audit_row(&mut self, key: &str, entry: &AuditLogEntry) -> Result<(), StorageError>;
    fn audit_rows(&self) -> Result<Vec<AuditLogEntry>, StorageError>;
}

impl<S: StateStore + ?Sized> WageRepo for S {
    fn wage_row(&self, wage_id: &str) -> Result<Option<WageRecord>, StorageError> {
        get_row(self, &wage_key(wage_id))
    }

    fn wage_row_exists(&self, wage_id: &str) -> Result<bool, StorageError> {
        Ok(self.get(&wage_key(wage_id))?.is_some())
    }

    fn insert_wage_row(&mut self, wage: &WageRecord) -> Result<(), StorageError> {
        insert_new_row(self, "wages", &wage_key(&wage.wage_id), wage)
    }

    fn wage_rows(&self) -> Result<Vec<WageRecord>, StorageError> {
        scan_rows(self, WAGE_PREFIX)
    }
}

impl<S: StateStore + ?Sized> IdentityRepo for S {
    fn identity_row(&self, user_id_hash: &str) -> Result<Option<IdentityRecord>, StorageError> {
        get_row(self, &user_key(user_id_hash))
    }

    fn identity_row_exists(&self, user_id_hash: &str) -> Result<bool, StorageError> {
        Ok(self.get(&user_key(user_id_hash))?.is_some())
    }

    fn insert_identity_row(&mut self, record: &IdentityRecord) -> Result<(), StorageError> {
        insert_new_row(self, "identities", &user_key(&record.user_id_hash), record)
    }

    fn update_identity_row(&mut self, record: &IdentityRecord) -> Result<(), StorageError> {
        put_row(self, &user_key(&record.user_id_hash), record)
    }
}

impl<S: StateStore + ?Sized> ThresholdRepo for S {
    fn threshold_row(
        &self,
        region: &str,
        category: PovertyCategory,
    ) -> Result<Option<PovertyThreshold>, StorageError> {
        get_row(self, &threshold_key(region, category))
    }

    fn put_threshold_row(&mut self, threshold: &PovertyThreshold) -> Result<(), StorageError> {
        put_row(
            self,
            &threshold_key(&threshold.region, threshold.category),
            threshold,
        )
    }
}

impl<S: StateStore + ?Sized> AnomalyRepo for S {
    fn anomaly_row(&self, wage_id: &str) -> Result<Option<AnomalyFlag>, StorageError> {
        get_row(self, &anomaly_key(wage_id))
    }

    fn put_anomaly_row(&mut self, flag: &AnomalyFlag) -> Result<(), StorageError> {
        put_row(self, &anomaly_key(&flag.wage_id), flag)
    }

    fn anomaly_rows(&self) -> Result<Vec<AnomalyFlag>, StorageError> {
        scan_rows(self, ANOMALY_PREFIX)
    }
}

impl<S: StateStore + ?Sized> AuditRepo for S {
    fn audit_row_exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    fn append_audit_row(&mut self, key: &str, entry: &AuditLogEntry) -> Result<(), StorageError> {
        if self.get(key)?.is_some() {
            return Err(StorageError::AppendOnlyViolation {
                table: "audit_log",
                key: key.to_string(),
            });
        }
        put_row(self, key, entry)
    }

    fn audit_rows(&self) -> Result<Vec<AuditLogEntry>, StorageError> {
        scan_rows(self, AUDIT_PREFIX)
    }
}
