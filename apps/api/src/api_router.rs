use axum::Router;
use axum::middleware::from_fn;
use axum::routing::{get, post, put};
use maintly_core::AppError;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let protected_routes = Router::new()
        .route(
            "/api/permissions",
            get(handlers::permissions::list_permissions_handler),
        )
        .route(
            "/api/permissions/grouped",
            get(handlers::permissions::list_permission_groups_handler),
        )
        .route(
            "/api/me/permissions",
            get(handlers::permissions::my_permissions_handler),
        )
        .route(
            "/api/me/permission-check",
            get(handlers::permissions::my_permission_check_handler),
        )
        .route(
            "/api/roles/{role}/permissions",
            get(handlers::permissions::role_permissions_handler)
                .put(handlers::permissions::replace_role_permissions_handler),
        )
        .route(
            "/api/users/{user_id}/effective-permissions",
            get(handlers::permissions::user_effective_permissions_handler),
        )
        .route(
            "/api/users/{user_id}/overrides",
            get(handlers::permissions::list_user_overrides_handler),
        )
        .route(
            "/api/users/{user_id}/overrides/{permission_id}",
            put(handlers::permissions::set_user_override_handler)
                .delete(handlers::permissions::clear_user_override_handler),
        )
        .route(
            "/api/users/{user_id}/overrides/{permission_id}/toggle",
            post(handlers::permissions::toggle_user_override_handler),
        )
        .route_layer(from_fn(middleware::require_actor));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(frontend_url)?)
        .with_state(app_state))
}
