use maintly_application::{PermissionAdminService, PermissionResolver};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub permission_admin_service: PermissionAdminService,
    /// Present only for the PostgreSQL backend; probed by the health check.
    pub postgres_pool: Option<PgPool>,
}

impl AppState {
    /// Resolver shared with the admin service and its cache.
    pub fn resolver(&self) -> &PermissionResolver {
        self.permission_admin_service.resolver()
    }
}
