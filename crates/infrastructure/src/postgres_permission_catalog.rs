use maintly_core::{AppResult, StoreKind};
use maintly_domain::{Permission, PermissionId};
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::InMemoryPermissionCatalog;
use crate::postgres_store_error::map_store_error;

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: uuid::Uuid,
    action: String,
    resource: String,
    description: Option<String>,
}

/// Loads the `permissions` table into an immutable in-memory catalog.
///
/// The catalog is read once at startup; it changes only through migrations.
pub async fn load_permission_catalog(pool: &PgPool) -> AppResult<InMemoryPermissionCatalog> {
    let rows = sqlx::query_as::<_, PermissionRow>(
        r#"
        SELECT id, action, resource, description
        FROM permissions
        ORDER BY resource, action
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|error| map_store_error(StoreKind::Catalog, "failed to load permissions", error))?;

    let permissions = rows
        .into_iter()
        .map(|row| {
            Permission::new(
                PermissionId::from_uuid(row.id),
                row.action.as_str(),
                row.resource.as_str(),
                row.description,
            )
        })
        .collect::<AppResult<Vec<_>>>()?;

    info!(permissions = permissions.len(), "loaded permission catalog");
    InMemoryPermissionCatalog::new(permissions)
}
