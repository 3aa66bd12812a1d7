mod common;
mod permissions;

pub use common::{HealthDependencyStatus, HealthResponse};
pub use permissions::{
    EffectivePermissionsResponse, PermissionChangeResponse, PermissionCheckQuery,
    PermissionCheckResponse, PermissionGroupResponse, PermissionResponse,
    ReplaceRolePermissionsRequest, RolePermissionsResponse, SetUserOverrideRequest,
    UserOverrideChangeResponse, UserOverrideResponse,
};
