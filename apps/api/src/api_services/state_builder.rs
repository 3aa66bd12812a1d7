use std::sync::Arc;

use maintly_application::{
    PermissionAdminService, PermissionCatalog, PermissionResolver, ResolutionCache,
};
use maintly_core::AppError;
use maintly_infrastructure::{
    PostgresRoleGrantStore, PostgresUserOverrideStore, PostgresUserRoleRepository,
    TracingPermissionChangeSink, load_permission_catalog,
};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::dev_seed;
use crate::state::AppState;

pub async fn build_postgres_state(
    pool: PgPool,
    resolution_cache_enabled: bool,
) -> Result<AppState, AppError> {
    let catalog = load_permission_catalog(&pool).await?;
    info!(permissions = catalog.len(), "loaded permission catalog");
    let catalog: Arc<dyn PermissionCatalog> = Arc::new(catalog);

    let resolver = PermissionResolver::new(
        catalog,
        Arc::new(PostgresRoleGrantStore::new(pool.clone())),
        Arc::new(PostgresUserOverrideStore::new(pool.clone())),
        Arc::new(PostgresUserRoleRepository::new(pool.clone())),
    );

    if resolution_cache_enabled {
        warn!(
            "resolution cache enabled with postgres storage; \
             writes from other instances do not invalidate it"
        );
    }

    Ok(AppState {
        permission_admin_service: admin_service(resolver, resolution_cache_enabled),
        postgres_pool: Some(pool),
    })
}

pub async fn build_memory_state(resolution_cache_enabled: bool) -> Result<AppState, AppError> {
    let stores = dev_seed::seed_memory_stores().await?;

    let resolver = PermissionResolver::new(
        stores.catalog,
        stores.role_grants,
        stores.overrides,
        stores.user_roles,
    );

    Ok(AppState {
        permission_admin_service: admin_service(resolver, resolution_cache_enabled),
        postgres_pool: None,
    })
}

fn admin_service(
    resolver: PermissionResolver,
    resolution_cache_enabled: bool,
) -> PermissionAdminService {
    let resolver = if resolution_cache_enabled {
        resolver.with_cache(Arc::new(ResolutionCache::new()))
    } else {
        info!("resolution cache disabled");
        resolver
    };

    PermissionAdminService::new(resolver, Arc::new(TracingPermissionChangeSink))
}
