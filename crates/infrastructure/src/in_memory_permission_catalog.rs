use std::collections::HashMap;

use async_trait::async_trait;
use maintly_application::PermissionCatalog;
use maintly_core::{AppError, AppResult};
use maintly_domain::{Permission, PermissionId, PermissionKey, sort_permissions};

/// Immutable permission catalog held in memory.
///
/// Also serves as the loaded form of the PostgreSQL catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPermissionCatalog {
    permissions: Vec<Permission>,
    by_id: HashMap<PermissionId, usize>,
    by_key: HashMap<PermissionKey, usize>,
}

impl InMemoryPermissionCatalog {
    /// Builds a catalog, rejecting duplicate identifiers or keys.
    pub fn new(permissions: Vec<Permission>) -> AppResult<Self> {
        let mut permissions = permissions;
        sort_permissions(&mut permissions);

        let mut by_id = HashMap::with_capacity(permissions.len());
        let mut by_key = HashMap::with_capacity(permissions.len());
        for (index, permission) in permissions.iter().enumerate() {
            if by_id.insert(permission.id(), index).is_some() {
                return Err(AppError::Conflict(format!(
                    "duplicate permission id '{}'",
                    permission.id()
                )));
            }
            if by_key.insert(permission.key().clone(), index).is_some() {
                return Err(AppError::Conflict(format!(
                    "duplicate permission '{}'",
                    permission.key()
                )));
            }
        }

        Ok(Self {
            permissions,
            by_id,
            by_key,
        })
    }

    /// Number of catalog permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

#[async_trait]
impl PermissionCatalog for InMemoryPermissionCatalog {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(self.permissions.clone())
    }

    async fn find_permission(&self, permission_id: PermissionId) -> AppResult<Option<Permission>> {
        Ok(self
            .by_id
            .get(&permission_id)
            .and_then(|index| self.permissions.get(*index))
            .cloned())
    }

    async fn find_permission_by_key(
        &self,
        key: &PermissionKey,
    ) -> AppResult<Option<Permission>> {
        Ok(self
            .by_key
            .get(key)
            .and_then(|index| self.permissions.get(*index))
            .cloned())
    }
}

/// Fails with `InvalidPermission` when any id is outside the catalog.
pub(crate) async fn ensure_in_catalog(
    catalog: &dyn PermissionCatalog,
    permission_ids: impl IntoIterator<Item = PermissionId>,
) -> AppResult<()> {
    for permission_id in permission_ids {
        if catalog.find_permission(permission_id).await?.is_none() {
            return Err(AppError::InvalidPermission(format!(
                "permission '{permission_id}' is not in the catalog"
            )));
        }
    }

    Ok(())
}
