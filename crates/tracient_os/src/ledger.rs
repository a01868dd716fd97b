#![forbid(unsafe_code)]

use tracient_engines::access::{AccessPolicyConfig, AccessPolicyEngine};

use crate::config::LedgerConfig;

/// Operation facade over a [`tracient_storage::StateStore`].
///
/// Each public method is one gated operation: it resolves the caller,
/// evaluates the operation's access rule, audits the decision, then runs
/// the entity logic. The ledger itself holds only immutable configuration;
/// all state lives in the store passed to each call.
#[derive(Debug, Clone)]
pub struct TracientLedger {
    pub(crate) policy: AccessPolicyEngine,
    pub(crate) config: LedgerConfig,
}

impl TracientLedger {
    pub fn new(policy: AccessPolicyConfig, config: LedgerConfig) -> Self {
        Self {
            policy: AccessPolicyEngine::new(policy),
            config,
        }
    }

    pub fn mvp_v1() -> Self {
        Self::new(AccessPolicyConfig::tracient_v1(), LedgerConfig::mvp_v1())
    }

    pub fn policy(&self) -> &AccessPolicyEngine {
        &self.policy
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

/// Names of the notifications emitted through the state store.
pub mod events {
    pub const WAGE_RECORDED: &str = "WageRecorded";
    pub const WAGE_BATCH_RECORDED: &str = "WageBatchRecorded";
    pub const USER_REGISTERED: &str = "UserRegistered";
    pub const POVERTY_THRESHOLD_UPDATED: &str = "PovertyThresholdUpdated";
    pub const POVERTY_STATUS_CHECKED: &str = "PovertyStatusChecked";
    pub const ANOMALY_FLAGGED: &str = "AnomalyFlagged";
    pub use tracient_storage::audit::HIGH_RISK_ACTIVITY_EVENT as HIGH_RISK_ACTIVITY;
}
