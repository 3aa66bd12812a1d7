use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use maintly_core::{AppError, AppResult, TenantId, UserIdentity};

use crate::error::ApiResult;

/// Gateway header carrying the authenticated user's UUID.
pub const SUBJECT_HEADER: &str = "x-maintly-subject";
/// Gateway header carrying the authenticated user's tenant UUID.
pub const TENANT_HEADER: &str = "x-maintly-tenant";

pub async fn require_actor(mut request: Request, next: Next) -> ApiResult<Response> {
    let identity = actor_from_headers(request.headers())?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub(crate) fn actor_from_headers(headers: &HeaderMap) -> AppResult<UserIdentity> {
    let subject = header_uuid(headers, SUBJECT_HEADER)?;
    let tenant_id = header_uuid(headers, TENANT_HEADER)?;

    Ok(UserIdentity::new(
        subject.to_string(),
        TenantId::from_uuid(tenant_id),
    ))
}

fn header_uuid(headers: &HeaderMap, name: &str) -> AppResult<uuid::Uuid> {
    let value = headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized(format!("missing {name} header")))?;

    uuid::Uuid::parse_str(value)
        .map_err(|error| AppError::Unauthorized(format!("invalid {name} header: {error}")))
}
