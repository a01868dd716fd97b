#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use tracing::info;
use tracient_engines::access::{default_clearance_for, default_permissions_for};
use tracient_kernel_contracts::access::Role;
use tracient_kernel_contracts::audit::{AuditEventType, AuditStatus};
use tracient_kernel_contracts::common::validate_text;
use tracient_kernel_contracts::identity::{IdentityRecord, UserStatus};
use tracient_kernel_contracts::ops;
use tracient_storage::repo::IdentityRepo;
use tracient_storage::StateStore;

use crate::error::LedgerError;
use crate::ledger::{events, TracientLedger};
use crate::tx::LedgerTx;

const USER_TARGET: &str = "user";

/// Registration input. Role is kept as the raw wire name so an unknown role
/// surfaces as a validation failure of the operation, not of decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub user_id: String,
    pub user_id_hash: String,
    pub role: String,
    pub organization_id: String,
    pub name: String,
    #[serde(default)]
    pub contact_hash: String,
    #[serde(default)]
    pub clearance_level: Option<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserRegistered<'a> {
    user_id_hash: &'a str,
    role: Role,
    organization_id: &'a str,
}

fn build_identity(req: RegisterUserRequest, registered_at: String) -> Result<IdentityRecord, LedgerError> {
    let role = Role::parse(&req.role).ok_or_else(|| LedgerError::invalid("role", "unknown role"))?;
    let clearance = req
        .clearance_level
        .unwrap_or_else(|| default_clearance_for(role));
    Ok(IdentityRecord::v1(
        req.user_id,
        req.user_id_hash,
        req.name,
        req.contact_hash,
        role,
        req.organization_id,
        clearance,
        default_permissions_for(role),
        registered_at,
    )?)
}

fn status_event(status: UserStatus) -> AuditEventType {
    match status {
        UserStatus::Suspended => AuditEventType::UserSuspended,
        UserStatus::Active => AuditEventType::UserActivated,
        UserStatus::Inactive => AuditEventType::UserUpdated,
    }
}

impl TracientLedger {
    pub fn register_user<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        req: RegisterUserRequest,
    ) -> Result<IdentityRecord, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::REGISTER_USER);
        let target = req.user_id_hash.clone();
        let caller = tx.gate(&self.policy, &target, USER_TARGET, None)?;
        tx.record_decision(
            AuditEventType::AccessGranted,
            &target,
            USER_TARGET,
            AuditStatus::Success,
            format!("role {}", caller.role),
        )?;

        let registered_at = tx.store.tx_timestamp().to_rfc3339();
        let record = build_identity(req, registered_at);
        let record = tx.audited(AuditEventType::UserRegistered, &target, USER_TARGET, record)?;
        let exists = tx
            .store
            .identity_row_exists(&record.user_id_hash)
            .map_err(LedgerError::from)
            .and_then(|exists| {
                if exists {
                    Err(LedgerError::Duplicate {
                        kind: "user",
                        id: record.user_id_hash.clone(),
                    })
                } else {
                    Ok(())
                }
            });
        tx.audited(AuditEventType::UserRegistered, &target, USER_TARGET, exists)?;
        let written = tx.store.insert_identity_row(&record).map_err(LedgerError::from);
        tx.audited(AuditEventType::UserRegistered, &target, USER_TARGET, written)?;

        tx.notify(
            events::USER_REGISTERED,
            &UserRegistered {
                user_id_hash: &record.user_id_hash,
                role: record.role,
                organization_id: &record.organization_id,
            },
        );
        tx.record_decision(
            AuditEventType::UserRegistered,
            &target,
            USER_TARGET,
            AuditStatus::Success,
            format!("registered {} in {}", record.role, record.organization_id),
        )?;
        info!(user = %record.user_id_hash, role = record.role.as_str(), "user registered");
        Ok(record)
    }

    pub fn get_user_profile<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        user_id_hash: &str,
    ) -> Result<IdentityRecord, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::GET_USER_PROFILE);
        tx.gate(&self.policy, user_id_hash, USER_TARGET, Some(user_id_hash))?;

        let found = tx.store.identity_row(user_id_hash).map_err(LedgerError::from);
        let found = tx.audited(AuditEventType::DataRead, user_id_hash, USER_TARGET, found)?;
        tx.record_decision(
            AuditEventType::DataRead,
            user_id_hash,
            USER_TARGET,
            AuditStatus::Success,
            if found.is_some() { "found" } else { "not found" },
        )?;
        found.ok_or_else(|| LedgerError::not_found("user", user_id_hash))
    }

    pub fn update_user_status<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        user_id_hash: &str,
        status: &str,
        updated_by: &str,
    ) -> Result<IdentityRecord, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::UPDATE_USER_STATUS);
        let caller = tx.gate(&self.policy, user_id_hash, USER_TARGET, None)?;
        tx.record_decision(
            AuditEventType::AccessGranted,
            user_id_hash,
            USER_TARGET,
            AuditStatus::Success,
            format!("role {}", caller.role),
        )?;

        let parsed = UserStatus::parse(status)
            .ok_or_else(|| LedgerError::invalid("status", "unknown user status"))
            .and_then(|s| {
                validate_text("updated_by", updated_by, 256)?;
                Ok(s)
            });
        let new_status = tx.audited(AuditEventType::UserUpdated, user_id_hash, USER_TARGET, parsed)?;
        let event = status_event(new_status);

        let found = tx
            .store
            .identity_row(user_id_hash)
            .map_err(LedgerError::from)
            .and_then(|r| r.ok_or_else(|| LedgerError::not_found("user", user_id_hash)));
        let mut record = tx.audited(event, user_id_hash, USER_TARGET, found)?;
        let previous = record.status;
        record.status = new_status;
        record.updated_at = tx.store.tx_timestamp().to_rfc3339();
        let written = tx.store.update_identity_row(&record).map_err(LedgerError::from);
        tx.audited(event, user_id_hash, USER_TARGET, written)?;

        tx.record_decision(
            event,
            user_id_hash,
            USER_TARGET,
            AuditStatus::Success,
            format!(
                "{} -> {} by {updated_by}",
                previous.as_str(),
                new_status.as_str()
            ),
        )?;
        info!(user = %user_id_hash, status = new_status.as_str(), "user status updated");
        Ok(record)
    }

    /// True when the stored role matches. Inactive or suspended users fail.
    pub fn verify_user_role<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        user_id_hash: &str,
        role: &str,
    ) -> Result<bool, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::VERIFY_USER_ROLE);
        tx.gate(&self.policy, user_id_hash, USER_TARGET, None)?;

        let expected = Role::parse(role).ok_or_else(|| LedgerError::invalid("role", "unknown role"));
        let expected = tx.audited(AuditEventType::DataRead, user_id_hash, USER_TARGET, expected)?;
        let record = tx
            .store
            .identity_row(user_id_hash)
            .map_err(LedgerError::from)
            .and_then(|r| r.ok_or_else(|| LedgerError::not_found("user", user_id_hash)))
            .and_then(|r| match r.status {
                UserStatus::Active => Ok(r),
                _ => Err(LedgerError::invalid("status", "user is not active")),
            });
        let record = tx.audited(AuditEventType::DataRead, user_id_hash, USER_TARGET, record)?;
        let matches = record.role == expected;

        tx.record_decision(
            AuditEventType::DataRead,
            user_id_hash,
            USER_TARGET,
            AuditStatus::Success,
            format!("role {} matches: {matches}", expected.as_str()),
        )?;
        Ok(matches)
    }

    pub fn user_exists<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        user_id_hash: &str,
    ) -> Result<bool, LedgerError> {
        let mut tx = LedgerTx::begin(store, ops::USER_EXISTS);
        tx.gate(&self.policy, user_id_hash, USER_TARGET, None)?;

        let exists = tx
            .store
            .identity_row_exists(user_id_hash)
            .map_err(LedgerError::from);
        let exists = tx.audited(AuditEventType::DataRead, user_id_hash, USER_TARGET, exists)?;
        tx.record_decision(
            AuditEventType::DataRead,
            user_id_hash,
            USER_TARGET,
            AuditStatus::Success,
            format!("exists: {exists}"),
        )?;
        Ok(exists)
    }
}
