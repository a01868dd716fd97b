#![forbid(unsafe_code)]

pub mod anomaly;
pub mod audit;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod threshold;
mod tx;
pub mod wage;

pub use config::LedgerConfig;
pub use error::LedgerError;
pub use identity::RegisterUserRequest;
pub use ledger::{events, TracientLedger};
