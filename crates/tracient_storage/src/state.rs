#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::ops::Bound;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracient_kernel_contracts::ContractViolation;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("duplicate key in {table}: {key}")]
    DuplicateKey { table: &'static str, key: String },
    #[error("append-only violation in {table}: {key}")]
    AppendOnlyViolation { table: &'static str, key: String },
    #[error("undecodable record at {key}: {detail}")]
    Codec { key: String, detail: String },
    #[error("state backend failure: {0}")]
    Backend(String),
    #[error(transparent)]
    ContractViolation(#[from] ContractViolation),
}

pub type ScanIter<'a> = Box<dyn Iterator<Item = (String, Vec<u8>)> + 'a>;

/// Deterministic key-value view of the ledger for one transaction.
///
/// Every timestamp the core records comes from `tx_timestamp`; nothing
/// reads a wall clock.
pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;
    /// Keys in `[start, end)`, ascending.
    fn scan_range<'a>(&'a self, start: &str, end: &str) -> Result<ScanIter<'a>, StorageError>;
    fn tx_id(&self) -> &str;
    fn tx_timestamp(&self) -> DateTime<Utc>;
    /// Raw credential of the submitter, if the transport supplied one.
    fn caller_credential(&self) -> Option<&str>;
    /// Fire-and-forget notification.
    fn emit_event(&mut self, name: &str, payload: Vec<u8>);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedEvent {
    pub tx_id: String,
    pub name: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
struct TxContext {
    tx_id: String,
    timestamp: DateTime<Utc>,
    credential: Option<String>,
}

/// In-memory reference store. State survives across transactions; the
/// transaction context is replaced by each `begin_transaction`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    data: BTreeMap<String, Vec<u8>>,
    tx: TxContext,
    events: Vec<EmittedEvent>,
}

impl MemoryStateStore {
    pub fn new_in_memory() -> Self {
        Self::default()
    }

    pub fn begin_transaction(
        &mut self,
        tx_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        credential: Option<String>,
    ) {
        self.tx = TxContext {
            tx_id: tx_id.into(),
            timestamp,
            credential,
        };
    }

    pub fn events(&self) -> &[EmittedEvent] {
        &self.events
    }

    pub fn events_named(&self, name: &str) -> Vec<&EmittedEvent> {
        self.events.iter().filter(|e| e.name == name).collect()
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.data
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        if key.is_empty() {
            return Err(StorageError::Backend("empty key".to_string()));
        }
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    fn scan_range<'a>(&'a self, start: &str, end: &str) -> Result<ScanIter<'a>, StorageError> {
        if start >= end {
            return Ok(Box::new(std::iter::empty()));
        }
        let range = self
            .data
            .range::<str, _>((Bound::Included(start), Bound::Excluded(end)))
            .map(|(k, v)| (k.clone(), v.clone()));
        Ok(Box::new(range))
    }

    fn tx_id(&self) -> &str {
        &self.tx.tx_id
    }

    fn tx_timestamp(&self) -> DateTime<Utc> {
        self.tx.timestamp
    }

    fn caller_credential(&self) -> Option<&str> {
        self.tx.credential.as_deref()
    }

    fn emit_event(&mut self, name: &str, payload: Vec<u8>) {
        self.events.push(EmittedEvent {
            tx_id: self.tx.tx_id.clone(),
            name: name.to_string(),
            payload,
        });
    }
}
