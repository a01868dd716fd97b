#![forbid(unsafe_code)]

pub mod access;
pub mod anomaly;
pub mod audit;
pub mod common;
pub mod identity;
pub mod ops;
pub mod report;
pub mod threshold;
pub mod wage;

pub use common::{parse_timestamp, ContractViolation, DateRange, Validate};
