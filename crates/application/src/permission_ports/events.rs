use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::Serialize;

use maintly_core::TenantId;
use maintly_domain::{AuditAction, PermissionId, Role, UserId};

/// Entity whose permissions changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ChangeTarget {
    /// A role's grant set changed.
    Role(Role),
    /// A user's overrides changed.
    User(UserId),
}

impl Display for ChangeTarget {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Role(role) => write!(formatter, "role:{role}"),
            Self::User(user_id) => write!(formatter, "user:{user_id}"),
        }
    }
}

/// Before and after state of one applied change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermissionChange {
    /// The grant set of a role was replaced.
    RoleGrantsReplaced {
        /// Edited role.
        role: Role,
        /// Grant set before the write.
        before: BTreeSet<PermissionId>,
        /// Grant set after the write.
        after: BTreeSet<PermissionId>,
    },
    /// An override row was inserted or updated.
    UserOverrideSet {
        /// Target user.
        user_id: UserId,
        /// Overridden permission.
        permission_id: PermissionId,
        /// Previous override value, `None` when no row existed.
        before: Option<bool>,
        /// New override value.
        after: bool,
    },
    /// An override row was removed.
    UserOverrideCleared {
        /// Target user.
        user_id: UserId,
        /// Permission that reverted to role grants.
        permission_id: PermissionId,
        /// Removed override value.
        before: bool,
    },
}

impl PermissionChange {
    /// Returns the entity the change applies to.
    #[must_use]
    pub fn target(&self) -> ChangeTarget {
        match self {
            Self::RoleGrantsReplaced { role, .. } => ChangeTarget::Role(*role),
            Self::UserOverrideSet { user_id, .. } | Self::UserOverrideCleared { user_id, .. } => {
                ChangeTarget::User(*user_id)
            }
        }
    }

    /// Returns the stable audit action for the change.
    #[must_use]
    pub fn audit_action(&self) -> AuditAction {
        match self {
            Self::RoleGrantsReplaced { .. } => AuditAction::RoleGrantsReplaced,
            Self::UserOverrideSet { .. } => AuditAction::UserOverrideSet,
            Self::UserOverrideCleared { .. } => AuditAction::UserOverrideCleared,
        }
    }

    /// Permissions present after the change but not before.
    #[must_use]
    pub fn added(&self) -> BTreeSet<PermissionId> {
        match self {
            Self::RoleGrantsReplaced { before, after, .. } => {
                after.difference(before).copied().collect()
            }
            Self::UserOverrideSet { .. } | Self::UserOverrideCleared { .. } => BTreeSet::new(),
        }
    }

    /// Permissions present before the change but not after.
    #[must_use]
    pub fn removed(&self) -> BTreeSet<PermissionId> {
        match self {
            Self::RoleGrantsReplaced { before, after, .. } => {
                before.difference(after).copied().collect()
            }
            Self::UserOverrideSet { .. } | Self::UserOverrideCleared { .. } => BTreeSet::new(),
        }
    }
}

/// Fact emitted after a successful administrative write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionChangeEvent {
    /// Subject of the administrator that made the change.
    pub actor: String,
    /// Tenant of the administrator.
    pub tenant_id: TenantId,
    /// Applied change.
    pub change: PermissionChange,
    /// Time the write completed.
    pub occurred_at: DateTime<Utc>,
}

impl PermissionChangeEvent {
    /// Returns a one-line human readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.change {
            PermissionChange::RoleGrantsReplaced { role, .. } => format!(
                "replaced grants of role '{role}' (+{} -{})",
                self.change.added().len(),
                self.change.removed().len()
            ),
            PermissionChange::UserOverrideSet {
                user_id,
                permission_id,
                after,
                ..
            } => format!(
                "{} permission '{permission_id}' for user '{user_id}'",
                if *after { "granted" } else { "revoked" }
            ),
            PermissionChange::UserOverrideCleared {
                user_id,
                permission_id,
                ..
            } => format!("cleared override of permission '{permission_id}' for user '{user_id}'"),
        }
    }
}
