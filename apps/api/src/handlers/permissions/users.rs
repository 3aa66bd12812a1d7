use super::*;

pub async fn user_effective_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let user_id = UserId::from_transport(user_id.as_str())?;
    let effective = state
        .permission_admin_service
        .effective_permissions_for(&user, user_id)
        .await?;

    Ok(Json(effective_response(effective)))
}

pub async fn list_user_overrides_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<UserOverrideResponse>>> {
    let user_id = UserId::from_transport(user_id.as_str())?;
    let overrides = state
        .permission_admin_service
        .user_overrides(&user, user_id)
        .await?
        .into_iter()
        .map(|entry| UserOverrideResponse {
            permission: PermissionResponse::from(entry.permission),
            state: entry.state.as_str().to_owned(),
            created_by: entry.created_by,
            created_at: entry.created_at,
        })
        .collect();

    Ok(Json(overrides))
}

pub async fn set_user_override_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((user_id, permission_id)): Path<(String, String)>,
    Json(payload): Json<SetUserOverrideRequest>,
) -> ApiResult<Json<UserOverrideChangeResponse>> {
    let (user_id, permission_id) = parse_target(user_id.as_str(), permission_id.as_str())?;
    let change = state
        .permission_admin_service
        .set_user_override(&user, user_id, permission_id, payload.granted)
        .await?;

    Ok(Json(UserOverrideChangeResponse {
        user_id: user_id.to_string(),
        permission_id: permission_id.to_string(),
        state: OverrideState::from_granted(Some(payload.granted))
            .as_str()
            .to_owned(),
        change: change.map(PermissionChangeResponse::from),
    }))
}

pub async fn clear_user_override_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((user_id, permission_id)): Path<(String, String)>,
) -> ApiResult<Json<UserOverrideChangeResponse>> {
    let (user_id, permission_id) = parse_target(user_id.as_str(), permission_id.as_str())?;
    let change = state
        .permission_admin_service
        .clear_user_override(&user, user_id, permission_id)
        .await?;

    Ok(Json(UserOverrideChangeResponse {
        user_id: user_id.to_string(),
        permission_id: permission_id.to_string(),
        state: OverrideState::Inherit.as_str().to_owned(),
        change: change.map(PermissionChangeResponse::from),
    }))
}

pub async fn toggle_user_override_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((user_id, permission_id)): Path<(String, String)>,
) -> ApiResult<Json<UserOverrideChangeResponse>> {
    let (user_id, permission_id) = parse_target(user_id.as_str(), permission_id.as_str())?;
    let outcome = state
        .permission_admin_service
        .toggle_user_override(&user, user_id, permission_id)
        .await?;

    Ok(Json(UserOverrideChangeResponse {
        user_id: user_id.to_string(),
        permission_id: permission_id.to_string(),
        state: outcome.state.as_str().to_owned(),
        change: outcome.event.map(PermissionChangeResponse::from),
    }))
}

fn parse_target(user_id: &str, permission_id: &str) -> AppResult<(UserId, PermissionId)> {
    Ok((
        UserId::from_transport(user_id)?,
        PermissionId::from_transport(permission_id)?,
    ))
}
