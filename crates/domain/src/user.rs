//! User-side permission types: identifiers, overrides and override states.

use std::fmt::{Display, Formatter};

use maintly_core::{AppError, AppResult, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::PermissionId;

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses a transport value into a user identifier.
    pub fn from_transport(value: &str) -> AppResult<Self> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid user id '{value}': {error}")))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for UserId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Per-user exception for one permission.
///
/// At most one row exists per `(user_id, permission_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissionOverride {
    /// User the override applies to.
    pub user_id: UserId,
    /// Overridden permission.
    pub permission_id: PermissionId,
    /// `true` adds the permission, `false` revokes it.
    pub granted: bool,
    /// Tenant of the administrator that wrote the row.
    pub tenant_id: TenantId,
    /// Subject of the administrator that wrote the row.
    pub created_by: Option<String>,
    /// Write timestamp in RFC3339.
    pub created_at: String,
}

/// Override state of one permission for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideState {
    /// No override row; role grants decide.
    Inherit,
    /// Additive override.
    Grant,
    /// Subtractive override.
    Revoke,
}

impl OverrideState {
    /// Maps a stored override value to a state.
    #[must_use]
    pub fn from_granted(granted: Option<bool>) -> Self {
        match granted {
            None => Self::Inherit,
            Some(true) => Self::Grant,
            Some(false) => Self::Revoke,
        }
    }

    /// Returns the stored override value for this state.
    #[must_use]
    pub fn granted(&self) -> Option<bool> {
        match self {
            Self::Inherit => None,
            Self::Grant => Some(true),
            Self::Revoke => Some(false),
        }
    }

    /// Next state when an administrator toggles the override.
    ///
    /// Inheriting users get an explicit grant first; explicit rows flip.
    #[must_use]
    pub fn toggled(&self) -> Self {
        match self {
            Self::Inherit | Self::Revoke => Self::Grant,
            Self::Grant => Self::Revoke,
        }
    }

    /// Stored value a toggle writes over `previous`.
    #[must_use]
    pub fn toggled_value(previous: Option<bool>) -> bool {
        !matches!(previous, Some(true))
    }

    /// Returns a stable storage value for this state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inherit => "inherit",
            Self::Grant => "grant",
            Self::Revoke => "revoke",
        }
    }
}
