#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::access::{PermissionSet, Role, MAX_CLEARANCE_LEVEL, MIN_CLEARANCE_LEVEL};
use crate::common::{validate_id, validate_text, ContractViolation, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Option<UserStatus> {
        match s {
            "active" => Some(UserStatus::Active),
            "inactive" => Some(UserStatus::Inactive),
            "suspended" => Some(UserStatus::Suspended),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub user_id: String,
    pub user_id_hash: String,
    pub name: String,
    pub contact_hash: String,
    pub role: Role,
    pub organization_id: String,
    pub clearance_level: u8,
    pub permissions: PermissionSet,
    pub status: UserStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl IdentityRecord {
    /// New registrations always start active with `created_at == updated_at`.
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        user_id: impl Into<String>,
        user_id_hash: impl Into<String>,
        name: impl Into<String>,
        contact_hash: impl Into<String>,
        role: Role,
        organization_id: impl Into<String>,
        clearance_level: u8,
        permissions: PermissionSet,
        registered_at: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let registered_at = registered_at.into();
        let r = Self {
            user_id: user_id.into(),
            user_id_hash: user_id_hash.into(),
            name: name.into(),
            contact_hash: contact_hash.into(),
            role,
            organization_id: organization_id.into(),
            clearance_level,
            permissions,
            status: UserStatus::Active,
            created_at: registered_at.clone(),
            updated_at: registered_at,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for IdentityRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("identity_record.user_id", &self.user_id, 128)?;
        validate_id("identity_record.user_id_hash", &self.user_id_hash, 256)?;
        validate_text("identity_record.name", &self.name, 256)?;
        if self.contact_hash.len() > 256 {
            return Err(ContractViolation::InvalidValue {
                field: "identity_record.contact_hash",
                reason: "too long",
            });
        }
        validate_id("identity_record.organization_id", &self.organization_id, 64)?;
        if !(MIN_CLEARANCE_LEVEL..=MAX_CLEARANCE_LEVEL).contains(&self.clearance_level) {
            return Err(ContractViolation::InvalidRange {
                field: "identity_record.clearance_level",
                min: f64::from(MIN_CLEARANCE_LEVEL),
                max: f64::from(MAX_CLEARANCE_LEVEL),
                got: f64::from(self.clearance_level),
            });
        }
        Ok(())
    }
}
