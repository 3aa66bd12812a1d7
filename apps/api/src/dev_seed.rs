use std::sync::Arc;

use maintly_application::PermissionCatalog;
use maintly_core::AppResult;
use maintly_domain::{Role, UserId};
use maintly_infrastructure::{
    InMemoryPermissionCatalog, InMemoryRoleGrantStore, InMemoryUserOverrideStore,
    InMemoryUserRoleRepository, default_role_grants, maintenance_catalog,
};
use tracing::info;

/// Holds `system_admin` in the in-memory backend.
pub const DEV_SEED_ADMIN_USER_ID: &str = "a2c8ea5f-4f39-4724-97f5-932f97f54f76";
/// Holds `technician` in the in-memory backend.
pub const DEV_SEED_TECHNICIAN_USER_ID: &str = "96d11e90-7403-4654-9727-cb1043f8bd31";

pub struct MemoryStores {
    pub catalog: Arc<InMemoryPermissionCatalog>,
    pub role_grants: Arc<InMemoryRoleGrantStore>,
    pub overrides: Arc<InMemoryUserOverrideStore>,
    pub user_roles: Arc<InMemoryUserRoleRepository>,
}

/// Builds in-memory stores holding the maintenance catalog, the default role
/// grants and two development users.
pub async fn seed_memory_stores() -> AppResult<MemoryStores> {
    let catalog = Arc::new(maintenance_catalog()?);
    let permissions = catalog.list_permissions().await?;

    let role_grants = Arc::new(InMemoryRoleGrantStore::new(catalog.clone()));
    for role in Role::all() {
        role_grants
            .seed(*role, default_role_grants(*role, &permissions)?)
            .await;
    }

    let user_roles = Arc::new(InMemoryUserRoleRepository::new());
    user_roles
        .assign(UserId::from_transport(DEV_SEED_ADMIN_USER_ID)?, Role::SystemAdmin)
        .await;
    user_roles
        .assign(
            UserId::from_transport(DEV_SEED_TECHNICIAN_USER_ID)?,
            Role::Technician,
        )
        .await;

    info!(
        permissions = permissions.len(),
        admin = DEV_SEED_ADMIN_USER_ID,
        technician = DEV_SEED_TECHNICIAN_USER_ID,
        "seeded in-memory permission stores"
    );

    Ok(MemoryStores {
        overrides: Arc::new(InMemoryUserOverrideStore::new(catalog.clone())),
        catalog,
        role_grants,
        user_roles,
    })
}
