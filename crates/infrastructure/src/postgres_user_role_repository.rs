use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use maintly_application::UserRoleRepository;
use maintly_core::{AppError, AppResult, StoreKind};
use maintly_domain::{Role, UserId};
use sqlx::PgPool;

use crate::postgres_store_error::map_store_error;

/// PostgreSQL-backed user role lookups.
#[derive(Clone)]
pub struct PostgresUserRoleRepository {
    pool: PgPool,
}

impl PostgresUserRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRoleRepository for PostgresUserRoleRepository {
    async fn roles_for_user(&self, user_id: UserId) -> AppResult<BTreeSet<Role>> {
        let values = sqlx::query_scalar::<_, String>(
            r#"
            SELECT role
            FROM user_roles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_store_error(StoreKind::UserRoles, "failed to load user roles", error))?;

        values
            .iter()
            .map(|value| {
                Role::from_str(value).map_err(|error| {
                    AppError::Internal(format!(
                        "user '{user_id}' has an invalid stored role: {error}"
                    ))
                })
            })
            .collect()
    }
}
