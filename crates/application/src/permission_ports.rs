use std::collections::BTreeSet;

use async_trait::async_trait;

use maintly_core::{AppError, AppResult, TenantId};
use maintly_domain::{
    OverrideMap, Permission, PermissionId, PermissionKey, Role, UserId, UserPermissionOverride,
};

mod events;

pub use events::{ChangeTarget, PermissionChange, PermissionChangeEvent};

/// Read-only registry of every definable permission.
#[async_trait]
pub trait PermissionCatalog: Send + Sync {
    /// Lists all permissions ordered by resource, then action.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Finds a permission by identifier.
    async fn find_permission(&self, permission_id: PermissionId) -> AppResult<Option<Permission>>;

    /// Finds a permission by its `(action, resource)` key.
    async fn find_permission_by_key(&self, key: &PermissionKey)
    -> AppResult<Option<Permission>>;

    /// Returns a permission by identifier or fails with `NotFound`.
    async fn get_permission(&self, permission_id: PermissionId) -> AppResult<Permission> {
        self.find_permission(permission_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("permission '{permission_id}'")))
    }
}

/// Role to permission grants.
#[async_trait]
pub trait RoleGrantStore: Send + Sync {
    /// Returns the grant set of a role; empty when the role has no grants.
    async fn grants_for_role(&self, role: Role) -> AppResult<BTreeSet<PermissionId>>;

    /// Atomically replaces the grant set of a role and returns the previous set.
    ///
    /// Readers observe either the previous or the new complete set. Fails with
    /// `InvalidPermission` when any identifier is outside the catalog.
    async fn replace_grants(
        &self,
        role: Role,
        permission_ids: BTreeSet<PermissionId>,
    ) -> AppResult<BTreeSet<PermissionId>>;
}

/// Input for upserting one user override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOverrideInput {
    /// Target user.
    pub user_id: UserId,
    /// Overridden permission.
    pub permission_id: PermissionId,
    /// `true` grants, `false` revokes.
    pub granted: bool,
    /// Tenant of the writing administrator.
    pub tenant_id: TenantId,
    /// Subject of the writing administrator.
    pub created_by: Option<String>,
}

/// Input for toggling one user override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOverrideInput {
    /// Target user.
    pub user_id: UserId,
    /// Overridden permission.
    pub permission_id: PermissionId,
    /// Tenant of the writing administrator.
    pub tenant_id: TenantId,
    /// Subject of the writing administrator.
    pub created_by: Option<String>,
}

/// Per-user permission overrides.
#[async_trait]
pub trait UserOverrideStore: Send + Sync {
    /// Returns the overrides of a user keyed by permission.
    async fn overrides_for_user(&self, user_id: UserId) -> AppResult<OverrideMap>;

    /// Returns the stored override rows of a user including write metadata.
    async fn override_records_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserPermissionOverride>>;

    /// Upserts one override row and returns the previous value.
    ///
    /// Fails with `InvalidPermission` when the permission is outside the catalog.
    async fn set_override(&self, input: SetOverrideInput) -> AppResult<Option<bool>>;

    /// Flips one override row as a single write and returns the previous value.
    ///
    /// A missing or revoking row becomes a grant and a granting row becomes a
    /// revoke, judged against the row as stored when the write applies.
    /// Fails with `InvalidPermission` when the permission is outside the catalog.
    async fn toggle_override(&self, input: ToggleOverrideInput) -> AppResult<Option<bool>>;

    /// Removes one override row and returns the removed value.
    ///
    /// Clearing a missing row is not an error and returns `None`.
    async fn clear_override(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<Option<bool>>;
}

/// Read access to the roles held by a user.
#[async_trait]
pub trait UserRoleRepository: Send + Sync {
    /// Returns the roles held by a user; empty for unknown users.
    async fn roles_for_user(&self, user_id: UserId) -> AppResult<BTreeSet<Role>>;
}

/// Receiver of permission change facts for the audit log.
#[async_trait]
pub trait PermissionChangeSink: Send + Sync {
    /// Publishes one applied change.
    async fn publish(&self, event: PermissionChangeEvent) -> AppResult<()>;
}
