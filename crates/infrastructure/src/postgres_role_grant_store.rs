use std::collections::BTreeSet;

use async_trait::async_trait;
use maintly_application::RoleGrantStore;
use maintly_core::{AppError, AppResult, StoreKind};
use maintly_domain::{PermissionId, Role};
use sqlx::{PgPool, Postgres, Transaction};

use crate::postgres_store_error::map_store_error;

/// PostgreSQL-backed role grant store.
///
/// A replace runs in one transaction guarded by a per-role advisory lock, so
/// concurrent writers to the same role apply one after another and readers see
/// the committed set before or after a write.
#[derive(Clone)]
pub struct PostgresRoleGrantStore {
    pool: PgPool,
}

impl PostgresRoleGrantStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleGrantStore for PostgresRoleGrantStore {
    async fn grants_for_role(&self, role: Role) -> AppResult<BTreeSet<PermissionId>> {
        let ids = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT permission_id
            FROM role_permissions
            WHERE role = $1
            "#,
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_store_error(StoreKind::RoleGrants, "failed to load role grants", error))?;

        Ok(ids.into_iter().map(PermissionId::from_uuid).collect())
    }

    async fn replace_grants(
        &self,
        role: Role,
        permission_ids: BTreeSet<PermissionId>,
    ) -> AppResult<BTreeSet<PermissionId>> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            map_store_error(StoreKind::RoleGrants, "failed to begin transaction", error)
        })?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext('role_permissions:' || $1))")
            .bind(role.as_str())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                map_store_error(StoreKind::RoleGrants, "failed to lock role grants", error)
            })?;

        let requested: Vec<uuid::Uuid> = permission_ids.iter().map(PermissionId::as_uuid).collect();
        ensure_catalog_ids(&mut transaction, &requested).await?;

        let previous = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT permission_id
            FROM role_permissions
            WHERE role = $1
            "#,
        )
        .bind(role.as_str())
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| map_store_error(StoreKind::RoleGrants, "failed to load role grants", error))?;

        sqlx::query(
            r#"
            DELETE FROM role_permissions
            WHERE role = $1 AND NOT (permission_id = ANY($2))
            "#,
        )
        .bind(role.as_str())
        .bind(&requested)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            map_store_error(StoreKind::RoleGrants, "failed to remove role grants", error)
        })?;

        sqlx::query(
            r#"
            INSERT INTO role_permissions (role, permission_id)
            SELECT $1, permission_id
            FROM UNNEST($2::uuid[]) AS requested(permission_id)
            ON CONFLICT (role, permission_id) DO NOTHING
            "#,
        )
        .bind(role.as_str())
        .bind(&requested)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_store_error(StoreKind::RoleGrants, "failed to add role grants", error))?;

        transaction.commit().await.map_err(|error| {
            map_store_error(StoreKind::RoleGrants, "failed to commit role grants", error)
        })?;

        Ok(previous.into_iter().map(PermissionId::from_uuid).collect())
    }
}

async fn ensure_catalog_ids(
    transaction: &mut Transaction<'_, Postgres>,
    requested: &[uuid::Uuid],
) -> AppResult<()> {
    let known = sqlx::query_scalar::<_, uuid::Uuid>(
        r#"
        SELECT id
        FROM permissions
        WHERE id = ANY($1)
        "#,
    )
    .bind(requested)
    .fetch_all(&mut **transaction)
    .await
    .map_err(|error| map_store_error(StoreKind::Catalog, "failed to validate permissions", error))?;

    if let Some(unknown) = requested.iter().find(|id| !known.contains(id)) {
        return Err(AppError::InvalidPermission(format!(
            "permission '{unknown}' is not in the catalog"
        )));
    }

    Ok(())
}
