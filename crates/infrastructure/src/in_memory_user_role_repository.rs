use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use maintly_application::UserRoleRepository;
use maintly_core::AppResult;
use maintly_domain::{Role, UserId};
use tokio::sync::RwLock;

/// In-memory user role assignments.
#[derive(Debug, Default)]
pub struct InMemoryUserRoleRepository {
    roles: RwLock<HashMap<UserId, BTreeSet<Role>>>,
}

impl InMemoryUserRoleRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a role to a user. Seeding and tests only.
    pub async fn assign(&self, user_id: UserId, role: Role) {
        self.roles
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(role);
    }
}

#[async_trait]
impl UserRoleRepository for InMemoryUserRoleRepository {
    async fn roles_for_user(&self, user_id: UserId) -> AppResult<BTreeSet<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}
