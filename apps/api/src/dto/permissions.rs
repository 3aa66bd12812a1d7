use serde::{Deserialize, Serialize};
use ts_rs::TS;

mod conversions;

/// API representation of a catalog permission.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-response.ts"
)]
pub struct PermissionResponse {
    pub permission_id: String,
    pub action: String,
    pub resource: String,
    /// `action:resource`.
    pub key: String,
    pub description: Option<String>,
}

/// Catalog permissions of one resource.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-group-response.ts"
)]
pub struct PermissionGroupResponse {
    pub resource: String,
    pub permissions: Vec<PermissionResponse>,
}

/// Effective permission set of one user.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/effective-permissions-response.ts"
)]
pub struct EffectivePermissionsResponse {
    pub user_id: String,
    pub permissions: Vec<PermissionResponse>,
    /// Granted ids the catalog no longer knows.
    pub skipped_permission_ids: Vec<String>,
}

/// Query string of a single permission check.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-check-query.ts"
)]
pub struct PermissionCheckQuery {
    pub action: String,
    pub resource: String,
}

/// Outcome of a single permission check.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-check-response.ts"
)]
pub struct PermissionCheckResponse {
    pub action: String,
    pub resource: String,
    pub permission_id: Option<String>,
    pub granted: bool,
    /// One of `override`, `roles`, `not_granted`, `unknown_permission`.
    pub source: String,
    pub granting_roles: Vec<String>,
}

/// Grant set of one role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-permissions-response.ts"
)]
pub struct RolePermissionsResponse {
    pub role: String,
    pub permissions: Vec<PermissionResponse>,
    /// Present after a write that changed the grant set.
    pub change: Option<PermissionChangeResponse>,
}

/// Incoming payload replacing the grant set of a role.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/replace-role-permissions-request.ts"
)]
pub struct ReplaceRolePermissionsRequest {
    pub permission_ids: Vec<String>,
}

/// Stored override of one user.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/user-override-response.ts"
)]
pub struct UserOverrideResponse {
    pub permission: PermissionResponse,
    /// `grant` or `revoke`.
    pub state: String,
    pub created_by: Option<String>,
    pub created_at: String,
}

/// Incoming payload for an override write.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/set-user-override-request.ts"
)]
pub struct SetUserOverrideRequest {
    pub granted: bool,
}

/// Result of an override write.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/user-override-change-response.ts"
)]
pub struct UserOverrideChangeResponse {
    pub user_id: String,
    pub permission_id: String,
    /// `inherit`, `grant` or `revoke` after the write.
    pub state: String,
    /// `None` when the write changed nothing.
    pub change: Option<PermissionChangeResponse>,
}

/// Applied administrative change.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-change-response.ts"
)]
pub struct PermissionChangeResponse {
    pub action: String,
    pub actor: String,
    pub tenant_id: String,
    pub target: String,
    pub summary: String,
    pub added_permission_ids: Vec<String>,
    pub removed_permission_ids: Vec<String>,
    pub occurred_at: String,
}
