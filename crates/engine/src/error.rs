//! The module contains the errors the engine can return.
//!
//! Family-directory precondition failures ([`AlreadyInFamily`],
//! [`RoleSlotTaken`], [`FamilyNotFound`]) are expected steady-state outcomes
//! and are surfaced with enough detail for an actionable message.
//! [`Timeout`] and [`Transient`] are retryable; everything else is not.
//!
//! [`AlreadyInFamily`]: EngineError::AlreadyInFamily
//! [`RoleSlotTaken`]: EngineError::RoleSlotTaken
//! [`FamilyNotFound`]: EngineError::FamilyNotFound
//! [`Timeout`]: EngineError::Timeout
//! [`Transient`]: EngineError::Transient
use sea_orm::DbErr;
use thiserror::Error;

use crate::users::Role;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("User {0} already belongs to a family")]
    AlreadyInFamily(String),
    #[error("Family \"{0}\" not found!")]
    FamilyNotFound(String),
    #[error("The {0} slot in this family is already taken")]
    RoleSlotTaken(Role),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Transient failure: {0}")]
    Transient(String),
    #[error("Profile provisioning failed: {0}")]
    ProfileProvisioningFailed(String),
    #[error("Profile refresh failed: {0}")]
    RefreshFailed(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid role: {0}")]
    InvalidRole(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Whether a caller may retry the failed operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Transient(_) | Self::Database(_)
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::AlreadyInFamily(a), Self::AlreadyInFamily(b)) => a == b,
            (Self::FamilyNotFound(a), Self::FamilyNotFound(b)) => a == b,
            (Self::RoleSlotTaken(a), Self::RoleSlotTaken(b)) => a == b,
            (Self::PermissionDenied(a), Self::PermissionDenied(b)) => a == b,
            (Self::Timeout(a), Self::Timeout(b)) => a == b,
            (Self::Transient(a), Self::Transient(b)) => a == b,
            (Self::ProfileProvisioningFailed(a), Self::ProfileProvisioningFailed(b)) => a == b,
            (Self::RefreshFailed(a), Self::RefreshFailed(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidRole(a), Self::InvalidRole(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
