#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracient_kernel_contracts::access::{
    CallerIdentity, Permission, Role, MAX_CLEARANCE_LEVEL, MIN_CLEARANCE_LEVEL,
};
use tracient_kernel_contracts::{ContractViolation, Validate};

use crate::access::default_permissions_for;

pub const ATTR_ROLE: &str = "role";
pub const ATTR_CLEARANCE_LEVEL: &str = "clearanceLevel";
pub const ATTR_ID_HASH: &str = "idHash";

/// Attribute values echoed in errors are cut to this many characters.
const ECHO_MAX_CHARS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("no caller credential presented")]
    MissingCredential,
    #[error("credential could not be decoded: {0}")]
    Undecodable(String),
    #[error("credential is missing attribute {0}")]
    MissingAttribute(&'static str),
    #[error("credential attribute {attribute} has invalid value {value:?}")]
    InvalidAttribute {
        attribute: &'static str,
        value: String,
    },
}

/// Wire form of a caller credential: base64 over a JSON attribute bag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerCredential {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub msp_id: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl CallerCredential {
    pub fn new(id: impl Into<String>, msp_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            msp_id: msp_id.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_role(self, role: Role) -> Self {
        self.with_attr(ATTR_ROLE, role.as_str())
    }

    pub fn with_clearance(self, level: u8) -> Self {
        self.with_attr(ATTR_CLEARANCE_LEVEL, level.to_string())
    }

    pub fn with_id_hash(self, id_hash: impl Into<String>) -> Self {
        self.with_attr(ATTR_ID_HASH, id_hash)
    }

    pub fn with_permission(self, p: Permission, granted: bool) -> Self {
        self.with_attr(p.as_str(), if granted { "true" } else { "false" })
    }

    pub fn encode(&self) -> String {
        STANDARD.encode(serde_json::to_vec(self).unwrap_or_default())
    }

    pub fn decode(raw: &str) -> Result<Self, IdentityError> {
        let bytes = STANDARD
            .decode(raw.trim())
            .map_err(|e| IdentityError::Undecodable(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| IdentityError::Undecodable(e.to_string()))
    }
}

/// Resolves the transaction's caller. Pure: no state reads, no side effects.
pub fn resolve_caller(raw: Option<&str>) -> Result<CallerIdentity, IdentityError> {
    let raw = raw
        .filter(|r| !r.trim().is_empty())
        .ok_or(IdentityError::MissingCredential)?;
    resolve_credential(&CallerCredential::decode(raw)?)
}

pub fn resolve_credential(cred: &CallerCredential) -> Result<CallerIdentity, IdentityError> {
    if cred.id.trim().is_empty() {
        return Err(IdentityError::MissingAttribute("id"));
    }
    if cred.msp_id.trim().is_empty() {
        return Err(IdentityError::MissingAttribute("mspId"));
    }

    let role_name = required_attr(cred, ATTR_ROLE)?;
    let role = Role::parse(role_name).ok_or_else(|| IdentityError::InvalidAttribute {
        attribute: ATTR_ROLE,
        value: echo(role_name),
    })?;

    let clearance_raw = required_attr(cred, ATTR_CLEARANCE_LEVEL)?;
    let clearance_level = clearance_raw
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|c| (MIN_CLEARANCE_LEVEL..=MAX_CLEARANCE_LEVEL).contains(c))
        .ok_or_else(|| IdentityError::InvalidAttribute {
            attribute: ATTR_CLEARANCE_LEVEL,
            value: echo(clearance_raw),
        })?;

    let id_hash = cred
        .attrs
        .get(ATTR_ID_HASH)
        .filter(|h| !h.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| cred.id.clone());

    let mut permissions = default_permissions_for(role);
    for (name, value) in &cred.attrs {
        if let Some(p) = Permission::parse(name) {
            permissions.insert(p, value == "true");
        }
    }

    let identity = CallerIdentity {
        id: cred.id.clone(),
        id_hash,
        organization_id: cred.msp_id.clone(),
        role,
        clearance_level,
        permissions,
    };
    identity
        .validate()
        .map_err(|v| rejected_field(&identity, &v))?;
    Ok(identity)
}

/// Maps a violation on the resolved identity back to the credential
/// attribute it came from.
fn rejected_field(identity: &CallerIdentity, violation: &ContractViolation) -> IdentityError {
    let field = match violation {
        ContractViolation::InvalidValue { field, .. }
        | ContractViolation::InvalidRange { field, .. }
        | ContractViolation::NotFinite { field }
        | ContractViolation::InvalidFormat { field, .. } => *field,
    };
    let (attribute, value) = match field {
        "caller_identity.id_hash" => (ATTR_ID_HASH, identity.id_hash.as_str()),
        "caller_identity.organization_id" => ("mspId", identity.organization_id.as_str()),
        "caller_identity.clearance_level" => {
            return IdentityError::InvalidAttribute {
                attribute: ATTR_CLEARANCE_LEVEL,
                value: identity.clearance_level.to_string(),
            }
        }
        _ => ("id", identity.id.as_str()),
    };
    IdentityError::InvalidAttribute {
        attribute,
        value: echo(value),
    }
}

fn echo(value: &str) -> String {
    value.chars().take(ECHO_MAX_CHARS).collect()
}

fn required_attr<'a>(
    cred: &'a CallerCredential,
    name: &'static str,
) -> Result<&'a str, IdentityError> {
    cred.attrs
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .ok_or(IdentityError::MissingAttribute(name))
}
