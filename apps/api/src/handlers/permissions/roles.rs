use super::*;

pub async fn role_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role): Path<String>,
) -> ApiResult<Json<RolePermissionsResponse>> {
    let role = Role::from_transport(role.as_str())?;
    let permissions = state
        .permission_admin_service
        .role_permissions(&user, role)
        .await?;

    Ok(Json(RolePermissionsResponse {
        role: role.as_str().to_owned(),
        permissions: permission_responses(permissions),
        change: None,
    }))
}

pub async fn replace_role_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role): Path<String>,
    Json(payload): Json<ReplaceRolePermissionsRequest>,
) -> ApiResult<Json<RolePermissionsResponse>> {
    let role = Role::from_transport(role.as_str())?;
    let permission_ids = payload
        .permission_ids
        .iter()
        .map(|value| PermissionId::from_transport(value.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    let change = state
        .permission_admin_service
        .replace_role_permissions(&user, role, permission_ids)
        .await?;
    let permissions = state
        .permission_admin_service
        .role_permissions(&user, role)
        .await?;

    Ok(Json(RolePermissionsResponse {
        role: role.as_str().to_owned(),
        permissions: permission_responses(permissions),
        change: change.map(PermissionChangeResponse::from),
    }))
}
