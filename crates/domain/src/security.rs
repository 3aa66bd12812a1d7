use serde::{Deserialize, Serialize};

/// Action of the permission administrators must hold to edit grants and overrides.
pub const MANAGE_PERMISSIONS_ACTION: &str = "manage";

/// Resource of the permission administrators must hold to edit grants and overrides.
pub const PERMISSIONS_RESOURCE: &str = "permissions";

/// Stable audit actions emitted by the administrative edit protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when the grant set of a role is replaced.
    RoleGrantsReplaced,
    /// Emitted when a user override is inserted or updated.
    UserOverrideSet,
    /// Emitted when a user override is removed.
    UserOverrideCleared,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleGrantsReplaced => "security.role_grants.replaced",
            Self::UserOverrideSet => "security.user_override.set",
            Self::UserOverrideCleared => "security.user_override.cleared",
        }
    }
}
