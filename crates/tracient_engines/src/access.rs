#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracient_kernel_contracts::access::{
    AccessDecision, AccessRule, CallerIdentity, DenyReason, Permission, PermissionSet, Role,
    SelfAccessField,
};
use tracient_kernel_contracts::{ops, ContractViolation, Validate};

pub const DESIGNATED_ORGANIZATION: &str = "Org1MSP";
pub const PARTNER_ORGANIZATION: &str = "Org2MSP";

#[derive(Debug, Error)]
pub enum PolicyConfigError {
    #[error("policy table is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("rule for {operation} is invalid: {violation}")]
    InvalidRule {
        operation: String,
        violation: ContractViolation,
    },
}

/// Immutable rule table: operation name to access rule, plus the role
/// groups used by the self-access step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicyConfig {
    pub rules: BTreeMap<String, AccessRule>,
    #[serde(default = "default_restricted_roles")]
    pub restricted_roles: Vec<Role>,
    #[serde(default = "default_override_roles")]
    pub self_access_override_roles: Vec<Role>,
}

fn default_restricted_roles() -> Vec<Role> {
    vec![Role::Worker, Role::Employer]
}

fn default_override_roles() -> Vec<Role> {
    vec![Role::Admin, Role::Auditor, Role::GovernmentOfficial]
}

fn rule(
    orgs: &[&str],
    roles: &[Role],
    min_clearance_level: u8,
    permissions: &[Permission],
    self_access_field: Option<SelfAccessField>,
    description: &str,
) -> AccessRule {
    AccessRule {
        allowed_organizations: orgs.iter().map(|o| o.to_string()).collect(),
        allowed_roles: roles.to_vec(),
        min_clearance_level,
        required_permissions: permissions.to_vec(),
        self_access_field,
        description: description.to_string(),
    }
}

impl AccessPolicyConfig {
    pub fn tracient_v1() -> Self {
        use Permission::*;
        use Role::*;
        use SelfAccessField::*;

        let org1 = &[DESIGNATED_ORGANIZATION][..];
        let both = &[DESIGNATED_ORGANIZATION, PARTNER_ORGANIZATION][..];
        let all = &Role::ALL[..];
        let oversight = &[Auditor, GovernmentOfficial, Admin][..];

        let table = [
            (ops::INIT_LEDGER, rule(org1, &[Admin], 10, &[], None, "seed default thresholds")),
            (
                ops::RECORD_WAGE,
                rule(both, &[Employer, Admin], 5, &[CanRecordWage], None, "record a wage payment"),
            ),
            (ops::READ_WAGE, rule(both, all, 1, &[], None, "read one wage record")),
            (ops::WAGE_EXISTS, rule(both, all, 1, &[], None, "check a wage id")),
            (
                ops::QUERY_WAGES_BY_WORKER,
                rule(both, all, 1, &[], Some(WorkerIdHash), "wages paid to a worker"),
            ),
            (
                ops::QUERY_WAGES_BY_EMPLOYER,
                rule(
                    both,
                    &[Employer, GovernmentOfficial, Auditor, Admin],
                    3,
                    &[],
                    Some(EmployerIdHash),
                    "wages paid by an employer",
                ),
            ),
            (
                ops::CALCULATE_TOTAL_INCOME,
                rule(both, all, 2, &[], Some(WorkerIdHash), "total income in a period"),
            ),
            (
                ops::GET_WORKER_INCOME_HISTORY,
                rule(both, all, 2, &[], Some(WorkerIdHash), "monthly income history"),
            ),
            (
                ops::BATCH_RECORD_WAGES,
                rule(
                    both,
                    &[Employer, Admin],
                    6,
                    &[CanRecordWage, CanBatchProcess],
                    None,
                    "record many wages at once",
                ),
            ),
            (
                ops::REGISTER_USER,
                rule(
                    org1,
                    &[GovernmentOfficial, Admin],
                    8,
                    &[CanRegisterUsers],
                    None,
                    "register an identity",
                ),
            ),
            (
                ops::GET_USER_PROFILE,
                rule(both, all, 1, &[], Some(UserIdHash), "read an identity"),
            ),
            (
                ops::UPDATE_USER_STATUS,
                rule(
                    org1,
                    &[GovernmentOfficial, Admin],
                    9,
                    &[CanManageUsers],
                    None,
                    "activate or suspend an identity",
                ),
            ),
            (ops::VERIFY_USER_ROLE, rule(both, all, 1, &[], None, "check an identity's role")),
            (ops::USER_EXISTS, rule(both, all, 1, &[], None, "check an identity exists")),
            (
                ops::SET_POVERTY_THRESHOLD,
                rule(
                    org1,
                    &[GovernmentOfficial, Admin],
                    8,
                    &[CanUpdateThresholds],
                    None,
                    "set a regional poverty line",
                ),
            ),
            (
                ops::GET_POVERTY_THRESHOLD,
                rule(both, all, 1, &[], None, "read a regional poverty line"),
            ),
            (
                ops::CHECK_POVERTY_STATUS,
                rule(both, all, 2, &[], Some(WorkerIdHash), "classify a worker BPL/APL"),
            ),
            (
                ops::FLAG_ANOMALY,
                rule(both, oversight, 7, &[CanFlagAnomaly], None, "flag a suspicious wage"),
            ),
            (
                ops::GET_FLAGGED_WAGES,
                rule(both, oversight, 6, &[], None, "list flagged wages"),
            ),
            (
                ops::UPDATE_ANOMALY_STATUS,
                rule(both, oversight, 7, &[CanReviewAnomaly], None, "review a flagged wage"),
            ),
            (
                ops::GENERATE_COMPLIANCE_REPORT,
                rule(both, oversight, 6, &[CanGenerateReport], None, "compliance reporting"),
            ),
            (ops::GET_AUDIT_LOGS, rule(both, oversight, 6, &[], None, "filtered audit log")),
            (
                ops::GET_AUDIT_SUMMARY,
                rule(both, oversight, 6, &[CanGenerateReport], None, "audit statistics"),
            ),
            (
                ops::GET_HIGH_RISK_EVENTS,
                rule(both, oversight, 6, &[CanGenerateReport], None, "high-risk audit entries"),
            ),
            (
                ops::GET_ACCESS_DENIALS,
                rule(
                    org1,
                    &[GovernmentOfficial, Admin],
                    9,
                    &[CanManageUsers],
                    None,
                    "denied access attempts",
                ),
            ),
            (
                ops::GET_USER_ACTIVITY_LOG,
                rule(both, all, 1, &[], Some(UserIdHash), "one identity's audit trail"),
            ),
        ];

        Self {
            rules: table
                .into_iter()
                .map(|(op, r)| (op.to_string(), r))
                .collect(),
            restricted_roles: default_restricted_roles(),
            self_access_override_roles: default_override_roles(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PolicyConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate_rules()?;
        Ok(config)
    }

    pub fn validate_rules(&self) -> Result<(), PolicyConfigError> {
        for (operation, r) in &self.rules {
            r.validate()
                .map_err(|violation| PolicyConfigError::InvalidRule {
                    operation: operation.clone(),
                    violation,
                })?;
        }
        Ok(())
    }
}

/// Pure role defaults. Every flag is present in the result.
pub fn default_permissions_for(role: Role) -> PermissionSet {
    use Permission::*;
    let granted: &[Permission] = match role {
        Role::Admin => &Permission::ALL,
        Role::GovernmentOfficial => &[
            CanUpdateThresholds,
            CanRegisterUsers,
            CanManageUsers,
            CanFlagAnomaly,
            CanReviewAnomaly,
            CanGenerateReport,
            CanReadAll,
        ],
        Role::Auditor => &[CanFlagAnomaly, CanReviewAnomaly, CanGenerateReport, CanReadAll],
        Role::BankOfficer => &[CanReadAll],
        Role::Employer => &[CanRecordWage, CanBatchProcess],
        Role::Worker => &[],
    };
    Permission::ALL
        .into_iter()
        .map(|p| (p, granted.contains(&p)))
        .collect()
}

pub fn default_clearance_for(role: Role) -> u8 {
    match role {
        Role::Worker => 2,
        Role::BankOfficer => 5,
        Role::Employer | Role::Auditor => 6,
        Role::GovernmentOfficial => 8,
        Role::Admin => 10,
    }
}

#[derive(Debug, Clone)]
pub struct AccessPolicyEngine {
    config: AccessPolicyConfig,
}

impl AccessPolicyEngine {
    pub fn new(config: AccessPolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AccessPolicyConfig {
        &self.config
    }

    pub fn rule(&self, operation: &str) -> Option<&AccessRule> {
        self.config.rules.get(operation)
    }

    /// Looks up the operation's rule and evaluates it. Unknown operations
    /// are denied.
    pub fn authorize(
        &self,
        operation: &str,
        caller: &CallerIdentity,
        target_id_hash: Option<&str>,
    ) -> AccessDecision {
        match self.rule(operation) {
            Some(r) => self.evaluate(r, caller, target_id_hash),
            None => AccessDecision::deny(
                DenyReason::NoRule,
                format!("no access rule for {operation}"),
            ),
        }
    }

    /// Short-circuit evaluation. Admin passes before any other check;
    /// empty allow-lists do not restrict.
    pub fn evaluate(
        &self,
        rule: &AccessRule,
        caller: &CallerIdentity,
        target_id_hash: Option<&str>,
    ) -> AccessDecision {
        if caller.role == Role::Admin {
            return AccessDecision::Allow;
        }
        if !rule.allowed_organizations.is_empty()
            && !rule
                .allowed_organizations
                .iter()
                .any(|o| o == &caller.organization_id)
        {
            return AccessDecision::deny(
                DenyReason::Organization,
                format!("organization {} not permitted", caller.organization_id),
            );
        }
        if !rule.allowed_roles.is_empty() && !rule.allowed_roles.contains(&caller.role) {
            return AccessDecision::deny(
                DenyReason::Role,
                format!("role {} not permitted", caller.role),
            );
        }
        if caller.clearance_level < rule.min_clearance_level {
            return AccessDecision::deny(
                DenyReason::Clearance,
                format!(
                    "clearance {} below required {}",
                    caller.clearance_level, rule.min_clearance_level
                ),
            );
        }
        if let Some(p) = rule
            .required_permissions
            .iter()
            .find(|p| !caller.has_permission(**p))
        {
            return AccessDecision::deny(
                DenyReason::Permission,
                format!("missing permission {}", p.as_str()),
            );
        }
        if rule.self_access_field.is_some() && self.is_self_restricted(caller.role) {
            if let Some(target) = target_id_hash {
                if target != caller.id_hash {
                    return AccessDecision::deny(
                        DenyReason::SelfAccess,
                        format!("role {} may only access its own records", caller.role),
                    );
                }
            }
        }
        AccessDecision::Allow
    }

    fn is_self_restricted(&self, role: Role) -> bool {
        self.config.restricted_roles.contains(&role)
            && !self.config.self_access_override_roles.contains(&role)
    }
}
