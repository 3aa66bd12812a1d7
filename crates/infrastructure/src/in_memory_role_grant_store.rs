use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use maintly_application::{PermissionCatalog, RoleGrantStore};
use maintly_core::AppResult;
use maintly_domain::{PermissionId, Role};
use tokio::sync::RwLock;

use crate::in_memory_permission_catalog::ensure_in_catalog;

type GrantSnapshot = Arc<BTreeSet<PermissionId>>;

/// In-memory role grant store.
///
/// Each role owns one slot holding an immutable snapshot. Replacing grants
/// swaps the snapshot under the slot's write lock, so readers see the old or
/// the new set and nothing in between.
pub struct InMemoryRoleGrantStore {
    catalog: Arc<dyn PermissionCatalog>,
    slots: HashMap<Role, RwLock<GrantSnapshot>>,
}

impl InMemoryRoleGrantStore {
    /// Creates an empty store validating writes against `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<dyn PermissionCatalog>) -> Self {
        Self {
            catalog,
            slots: Role::all()
                .iter()
                .map(|role| (*role, RwLock::default()))
                .collect(),
        }
    }

    /// Sets grants without catalog validation. Intended for seeding.
    pub async fn seed(&self, role: Role, permission_ids: impl IntoIterator<Item = PermissionId>) {
        if let Some(slot) = self.slots.get(&role) {
            *slot.write().await = Arc::new(permission_ids.into_iter().collect());
        }
    }

    async fn snapshot(&self, role: Role) -> GrantSnapshot {
        match self.slots.get(&role) {
            Some(slot) => slot.read().await.clone(),
            None => GrantSnapshot::default(),
        }
    }
}

#[async_trait]
impl RoleGrantStore for InMemoryRoleGrantStore {
    async fn grants_for_role(&self, role: Role) -> AppResult<BTreeSet<PermissionId>> {
        Ok(self.snapshot(role).await.as_ref().clone())
    }

    async fn replace_grants(
        &self,
        role: Role,
        permission_ids: BTreeSet<PermissionId>,
    ) -> AppResult<BTreeSet<PermissionId>> {
        ensure_in_catalog(self.catalog.as_ref(), permission_ids.iter().copied()).await?;

        let Some(slot) = self.slots.get(&role) else {
            return Ok(BTreeSet::new());
        };

        let previous = {
            let mut grants = slot.write().await;
            std::mem::replace(&mut *grants, Arc::new(permission_ids))
        };

        Ok(Arc::unwrap_or_clone(previous))
    }
}

#[cfg(test)]
mod tests;
