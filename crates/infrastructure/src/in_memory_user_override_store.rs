use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use maintly_application::{
    PermissionCatalog, SetOverrideInput, ToggleOverrideInput, UserOverrideStore,
};
use maintly_core::AppResult;
use maintly_domain::{OverrideMap, OverrideState, PermissionId, UserId, UserPermissionOverride};
use tokio::sync::RwLock;

use crate::in_memory_permission_catalog::ensure_in_catalog;

/// In-memory user override store keyed by `(user, permission)`.
pub struct InMemoryUserOverrideStore {
    catalog: Arc<dyn PermissionCatalog>,
    rows: RwLock<HashMap<UserId, BTreeMap<PermissionId, UserPermissionOverride>>>,
}

impl InMemoryUserOverrideStore {
    /// Creates an empty store validating writes against `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<dyn PermissionCatalog>) -> Self {
        Self {
            catalog,
            rows: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl UserOverrideStore for InMemoryUserOverrideStore {
    async fn overrides_for_user(&self, user_id: UserId) -> AppResult<OverrideMap> {
        Ok(self
            .rows
            .read()
            .await
            .get(&user_id)
            .map(|rows| {
                rows.iter()
                    .map(|(permission_id, row)| (*permission_id, row.granted))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn override_records_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserPermissionOverride>> {
        Ok(self
            .rows
            .read()
            .await
            .get(&user_id)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_override(&self, input: SetOverrideInput) -> AppResult<Option<bool>> {
        ensure_in_catalog(self.catalog.as_ref(), [input.permission_id]).await?;

        let row = UserPermissionOverride {
            user_id: input.user_id,
            permission_id: input.permission_id,
            granted: input.granted,
            tenant_id: input.tenant_id,
            created_by: input.created_by,
            created_at: Utc::now().to_rfc3339(),
        };

        Ok(self
            .rows
            .write()
            .await
            .entry(input.user_id)
            .or_default()
            .insert(input.permission_id, row)
            .map(|previous| previous.granted))
    }

    async fn toggle_override(&self, input: ToggleOverrideInput) -> AppResult<Option<bool>> {
        ensure_in_catalog(self.catalog.as_ref(), [input.permission_id]).await?;

        let mut rows = self.rows.write().await;
        let user_rows = rows.entry(input.user_id).or_default();
        let previous = user_rows.get(&input.permission_id).map(|row| row.granted);
        user_rows.insert(
            input.permission_id,
            UserPermissionOverride {
                user_id: input.user_id,
                permission_id: input.permission_id,
                granted: OverrideState::toggled_value(previous),
                tenant_id: input.tenant_id,
                created_by: input.created_by,
                created_at: Utc::now().to_rfc3339(),
            },
        );

        Ok(previous)
    }

    async fn clear_override(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<Option<bool>> {
        let mut rows = self.rows.write().await;
        let Some(user_rows) = rows.get_mut(&user_id) else {
            return Ok(None);
        };

        let removed = user_rows.remove(&permission_id).map(|row| row.granted);
        if user_rows.is_empty() {
            rows.remove(&user_id);
        }

        Ok(removed)
    }
}
