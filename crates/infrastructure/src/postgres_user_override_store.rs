use async_trait::async_trait;
use chrono::{DateTime, Utc};
use maintly_application::{SetOverrideInput, ToggleOverrideInput, UserOverrideStore};
use maintly_core::{AppResult, StoreKind, TenantId};
use maintly_domain::{OverrideMap, OverrideState, PermissionId, UserId, UserPermissionOverride};
use sqlx::{FromRow, PgPool};

use crate::postgres_store_error::map_store_error;

/// PostgreSQL-backed user override store.
#[derive(Clone)]
pub struct PostgresUserOverrideStore {
    pool: PgPool,
}

impl PostgresUserOverrideStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct OverrideWrite<'a> {
    user_id: UserId,
    permission_id: PermissionId,
    tenant_id: TenantId,
    created_by: Option<&'a str>,
}

impl PostgresUserOverrideStore {
    /// Writes one row in a transaction holding the `(user, permission)`
    /// advisory lock, so the value is chosen against the committed row even
    /// when no row exists yet.
    async fn write_override(
        &self,
        write: OverrideWrite<'_>,
        next_value: impl FnOnce(Option<bool>) -> bool + Send,
    ) -> AppResult<Option<bool>> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            map_store_error(StoreKind::UserOverrides, "failed to begin transaction", error)
        })?;

        sqlx::query(
            r#"
            SELECT pg_advisory_xact_lock(
                hashtext('user_permission_overrides:' || $1::text || ':' || $2::text)
            )
            "#,
        )
        .bind(write.user_id.as_uuid())
        .bind(write.permission_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            map_store_error(StoreKind::UserOverrides, "failed to lock override", error)
        })?;

        let previous = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT granted
            FROM user_permission_overrides
            WHERE user_id = $1 AND permission_id = $2
            FOR UPDATE
            "#,
        )
        .bind(write.user_id.as_uuid())
        .bind(write.permission_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            map_store_error(StoreKind::UserOverrides, "failed to read override", error)
        })?;

        sqlx::query(
            r#"
            INSERT INTO user_permission_overrides (
                user_id, permission_id, granted, tenant_id, created_by
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, permission_id) DO UPDATE
            SET granted = EXCLUDED.granted,
                tenant_id = EXCLUDED.tenant_id,
                created_by = EXCLUDED.created_by,
                created_at = now()
            "#,
        )
        .bind(write.user_id.as_uuid())
        .bind(write.permission_id.as_uuid())
        .bind(next_value(previous))
        .bind(write.tenant_id.as_uuid())
        .bind(write.created_by)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            map_store_error(StoreKind::UserOverrides, "failed to write override", error)
        })?;

        transaction.commit().await.map_err(|error| {
            map_store_error(StoreKind::UserOverrides, "failed to commit override", error)
        })?;

        Ok(previous)
    }
}

#[derive(Debug, FromRow)]
struct OverrideRow {
    user_id: uuid::Uuid,
    permission_id: uuid::Uuid,
    granted: bool,
    tenant_id: uuid::Uuid,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OverrideRow> for UserPermissionOverride {
    fn from(row: OverrideRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            permission_id: PermissionId::from_uuid(row.permission_id),
            granted: row.granted,
            tenant_id: TenantId::from_uuid(row.tenant_id),
            created_by: row.created_by,
            created_at: row.created_at.to_rfc3339(),
        }
    }
}

#[async_trait]
impl UserOverrideStore for PostgresUserOverrideStore {
    async fn overrides_for_user(&self, user_id: UserId) -> AppResult<OverrideMap> {
        let rows = sqlx::query_as::<_, (uuid::Uuid, bool)>(
            r#"
            SELECT permission_id, granted
            FROM user_permission_overrides
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            map_store_error(StoreKind::UserOverrides, "failed to load overrides", error)
        })?;

        Ok(rows
            .into_iter()
            .map(|(permission_id, granted)| (PermissionId::from_uuid(permission_id), granted))
            .collect())
    }

    async fn override_records_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserPermissionOverride>> {
        let rows = sqlx::query_as::<_, OverrideRow>(
            r#"
            SELECT user_id, permission_id, granted, tenant_id, created_by, created_at
            FROM user_permission_overrides
            WHERE user_id = $1
            ORDER BY created_at, permission_id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            map_store_error(StoreKind::UserOverrides, "failed to load override rows", error)
        })?;

        Ok(rows.into_iter().map(UserPermissionOverride::from).collect())
    }

    async fn set_override(&self, input: SetOverrideInput) -> AppResult<Option<bool>> {
        let granted = input.granted;
        self.write_override(
            OverrideWrite {
                user_id: input.user_id,
                permission_id: input.permission_id,
                tenant_id: input.tenant_id,
                created_by: input.created_by.as_deref(),
            },
            |_| granted,
        )
        .await
    }

    async fn toggle_override(&self, input: ToggleOverrideInput) -> AppResult<Option<bool>> {
        self.write_override(
            OverrideWrite {
                user_id: input.user_id,
                permission_id: input.permission_id,
                tenant_id: input.tenant_id,
                created_by: input.created_by.as_deref(),
            },
            OverrideState::toggled_value,
        )
        .await
    }

    async fn clear_override(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<Option<bool>> {
        sqlx::query_scalar::<_, bool>(
            r#"
            DELETE FROM user_permission_overrides
            WHERE user_id = $1 AND permission_id = $2
            RETURNING granted
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(permission_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_store_error(StoreKind::UserOverrides, "failed to clear override", error))
    }
}
