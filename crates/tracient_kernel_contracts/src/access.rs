#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{validate_id, validate_text, ContractViolation, Validate};

pub const MIN_CLEARANCE_LEVEL: u8 = 1;
pub const MAX_CLEARANCE_LEVEL: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Worker,
    Employer,
    GovernmentOfficial,
    BankOfficer,
    Auditor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Worker,
        Role::Employer,
        Role::GovernmentOfficial,
        Role::BankOfficer,
        Role::Auditor,
        Role::Admin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Worker => "worker",
            Role::Employer => "employer",
            Role::GovernmentOfficial => "government_official",
            Role::BankOfficer => "bank_officer",
            Role::Auditor => "auditor",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    CanRecordWage,
    CanBatchProcess,
    CanRegisterUsers,
    CanManageUsers,
    CanUpdateThresholds,
    CanFlagAnomaly,
    CanReviewAnomaly,
    CanGenerateReport,
    CanReadAll,
    CanExport,
}

impl Permission {
    pub const ALL: [Permission; 10] = [
        Permission::CanRecordWage,
        Permission::CanBatchProcess,
        Permission::CanRegisterUsers,
        Permission::CanManageUsers,
        Permission::CanUpdateThresholds,
        Permission::CanFlagAnomaly,
        Permission::CanReviewAnomaly,
        Permission::CanGenerateReport,
        Permission::CanReadAll,
        Permission::CanExport,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::CanRecordWage => "canRecordWage",
            Permission::CanBatchProcess => "canBatchProcess",
            Permission::CanRegisterUsers => "canRegisterUsers",
            Permission::CanManageUsers => "canManageUsers",
            Permission::CanUpdateThresholds => "canUpdateThresholds",
            Permission::CanFlagAnomaly => "canFlagAnomaly",
            Permission::CanReviewAnomaly => "canReviewAnomaly",
            Permission::CanGenerateReport => "canGenerateReport",
            Permission::CanReadAll => "canReadAll",
            Permission::CanExport => "canExport",
        }
    }

    pub fn parse(s: &str) -> Option<Permission> {
        Permission::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

/// Named boolean flags. A missing flag reads as `false`.
pub type PermissionSet = BTreeMap<Permission, bool>;

pub fn has_permission(set: &PermissionSet, p: Permission) -> bool {
    set.get(&p).copied().unwrap_or(false)
}

/// Which argument of an operation names the identity a restricted caller
/// may only touch when it is their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelfAccessField {
    WorkerIdHash,
    EmployerIdHash,
    UserIdHash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRule {
    #[serde(default)]
    pub allowed_organizations: Vec<String>,
    #[serde(default)]
    pub allowed_roles: Vec<Role>,
    pub min_clearance_level: u8,
    #[serde(default)]
    pub required_permissions: Vec<Permission>,
    #[serde(default)]
    pub self_access_field: Option<SelfAccessField>,
    #[serde(default)]
    pub description: String,
}

impl Validate for AccessRule {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.min_clearance_level > MAX_CLEARANCE_LEVEL {
            return Err(ContractViolation::InvalidRange {
                field: "access_rule.min_clearance_level",
                min: 0.0,
                max: f64::from(MAX_CLEARANCE_LEVEL),
                got: f64::from(self.min_clearance_level),
            });
        }
        for org in &self.allowed_organizations {
            validate_id("access_rule.allowed_organizations", org, 64)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Organization,
    Role,
    Clearance,
    Permission,
    SelfAccess,
    NoRule,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::Organization => "organization",
            DenyReason::Role => "role",
            DenyReason::Clearance => "clearance",
            DenyReason::Permission => "permission",
            DenyReason::SelfAccess => "self_access",
            DenyReason::NoRule => "no_rule",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny { reason: DenyReason, detail: String },
}

impl AccessDecision {
    pub fn deny(reason: DenyReason, detail: impl Into<String>) -> Self {
        AccessDecision::Deny {
            reason,
            detail: detail.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

/// Resolved, trusted view of whoever submitted the current transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    pub id: String,
    pub id_hash: String,
    pub organization_id: String,
    pub role: Role,
    pub clearance_level: u8,
    pub permissions: PermissionSet,
}

impl CallerIdentity {
    pub fn has_permission(&self, p: Permission) -> bool {
        has_permission(&self.permissions, p)
    }
}

impl Validate for CallerIdentity {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("caller_identity.id", &self.id, 512)?;
        validate_text("caller_identity.id_hash", &self.id_hash, 512)?;
        validate_id("caller_identity.organization_id", &self.organization_id, 64)?;
        if !(MIN_CLEARANCE_LEVEL..=MAX_CLEARANCE_LEVEL).contains(&self.clearance_level) {
            return Err(ContractViolation::InvalidRange {
                field: "caller_identity.clearance_level",
                min: f64::from(MIN_CLEARANCE_LEVEL),
                max: f64::from(MAX_CLEARANCE_LEVEL),
                got: f64::from(self.clearance_level),
            });
        }
        Ok(())
    }
}
