use axum::Json;
use axum::extract::{Extension, Path, Query, State};

use maintly_application::EffectivePermissions;
use maintly_core::{AppResult, UserIdentity};
use maintly_domain::{OverrideState, Permission, PermissionId, Role, UserId};

use crate::dto::{
    EffectivePermissionsResponse, PermissionChangeResponse, PermissionCheckQuery,
    PermissionCheckResponse, PermissionGroupResponse, PermissionResponse,
    ReplaceRolePermissionsRequest, RolePermissionsResponse, SetUserOverrideRequest,
    UserOverrideChangeResponse, UserOverrideResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

mod catalog;
mod me;
mod roles;
mod users;

pub use catalog::{list_permission_groups_handler, list_permissions_handler};
pub use me::{my_permission_check_handler, my_permissions_handler};
pub use roles::{replace_role_permissions_handler, role_permissions_handler};
pub use users::{
    clear_user_override_handler, list_user_overrides_handler, set_user_override_handler,
    toggle_user_override_handler, user_effective_permissions_handler,
};

fn permission_responses(
    permissions: impl IntoIterator<Item = Permission>,
) -> Vec<PermissionResponse> {
    permissions
        .into_iter()
        .map(PermissionResponse::from)
        .collect()
}

fn effective_response(effective: EffectivePermissions) -> EffectivePermissionsResponse {
    let user_id = effective.user_id().to_string();
    let skipped_permission_ids = effective
        .skipped()
        .iter()
        .map(ToString::to_string)
        .collect();

    EffectivePermissionsResponse {
        user_id,
        permissions: permission_responses(effective.into_permissions()),
        skipped_permission_ids,
    }
}

fn actor_user_id(actor: &UserIdentity) -> AppResult<UserId> {
    Ok(UserId::from_uuid(actor.subject_uuid()?))
}
