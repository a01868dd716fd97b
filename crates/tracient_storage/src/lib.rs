#![forbid(unsafe_code)]

pub mod audit;
pub mod keys;
pub mod repo;
pub mod state;

pub use state::{MemoryStateStore, StateStore, StorageError};
