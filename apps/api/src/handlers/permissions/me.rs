use super::*;

pub async fn my_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let effective = state
        .resolver()
        .compute_effective(actor_user_id(&user)?)
        .await?;

    Ok(Json(effective_response(effective)))
}

pub async fn my_permission_check_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(query): Query<PermissionCheckQuery>,
) -> ApiResult<Json<PermissionCheckResponse>> {
    let decision = state
        .resolver()
        .decide(
            actor_user_id(&user)?,
            query.action.as_str(),
            query.resource.as_str(),
        )
        .await?;

    Ok(Json(PermissionCheckResponse::from(decision)))
}
