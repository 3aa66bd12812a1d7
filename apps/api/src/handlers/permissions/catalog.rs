use super::*;

pub async fn list_permissions_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state.permission_admin_service.catalog().await?;

    Ok(Json(permission_responses(permissions)))
}

pub async fn list_permission_groups_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PermissionGroupResponse>>> {
    let groups = state
        .permission_admin_service
        .catalog_grouped_by_resource()
        .await?
        .into_iter()
        .map(|(resource, permissions)| PermissionGroupResponse {
            resource,
            permissions: permission_responses(permissions),
        })
        .collect();

    Ok(Json(groups))
}
