use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use maintly_core::{AppError, AppResult};
use maintly_domain::{
    GrantSource, OverrideMap, Permission, PermissionId, PermissionKey, Role, RoleGrantSets,
    UserId, combine, decide, group_by_resource, sort_permissions,
};

use crate::{
    PermissionCatalog, ResolutionCache, RoleGrantStore, UserOverrideStore, UserRoleRepository,
};

/// Store inputs read for one user and the effective ids derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserResolution {
    user_id: UserId,
    role_grants: RoleGrantSets,
    overrides: OverrideMap,
    effective: BTreeSet<PermissionId>,
}

impl UserResolution {
    /// Combines the grant sets of the user's roles with the user's overrides.
    #[must_use]
    pub fn new(user_id: UserId, role_grants: RoleGrantSets, overrides: OverrideMap) -> Self {
        let effective = combine(&role_grants, &overrides);
        Self {
            user_id,
            role_grants,
            overrides,
            effective,
        }
    }

    /// Resolution of a user without roles or overrides.
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        Self::new(user_id, RoleGrantSets::new(), OverrideMap::new())
    }

    /// Resolved user.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Roles the user held when resolved.
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.role_grants.keys().copied()
    }

    /// Overrides the user had when resolved.
    #[must_use]
    pub fn overrides(&self) -> &OverrideMap {
        &self.overrides
    }

    /// Effective permission ids, including ids the catalog may no longer know.
    #[must_use]
    pub fn permission_ids(&self) -> &BTreeSet<PermissionId> {
        &self.effective
    }

    /// Explains one permission against the same inputs.
    #[must_use]
    pub fn decide(&self, permission_id: PermissionId) -> GrantSource {
        decide(permission_id, &self.role_grants, &self.overrides)
    }
}

/// How a point query was decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecisionSource {
    /// The permission exists and was resolved against roles and overrides.
    Resolved {
        /// Grant source.
        source: GrantSource,
    },
    /// No catalog permission matches the requested key.
    UnknownPermission,
}

/// Outcome of a single permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDecision {
    /// Requested key.
    pub key: PermissionKey,
    /// Matching catalog permission, when one exists.
    pub permission_id: Option<PermissionId>,
    /// Whether the user holds the permission.
    pub granted: bool,
    /// Why the decision came out this way.
    pub source: DecisionSource,
}

/// Point-in-time effective permission set of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePermissions {
    user_id: UserId,
    permissions: Vec<Permission>,
    skipped: Vec<PermissionId>,
}

impl EffectivePermissions {
    /// Resolved user.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Effective permissions ordered by resource, then action.
    #[must_use]
    pub fn permissions(&self) -> &[Permission] {
        self.permissions.as_slice()
    }

    /// Consumes the value and returns the permissions.
    #[must_use]
    pub fn into_permissions(self) -> Vec<Permission> {
        self.permissions
    }

    /// Granted ids that were skipped because the catalog no longer knows them.
    #[must_use]
    pub fn skipped(&self) -> &[PermissionId] {
        self.skipped.as_slice()
    }

    /// Returns whether `(action, resource)` is in the set.
    #[must_use]
    pub fn contains(&self, action: &str, resource: &str) -> bool {
        let Ok(key) = PermissionKey::new(action, resource) else {
            return false;
        };
        self.permissions.iter().any(|permission| permission.key() == &key)
    }

    /// Keys of the effective permissions in resolution order.
    pub fn keys(&self) -> impl Iterator<Item = &PermissionKey> + '_ {
        self.permissions.iter().map(Permission::key)
    }

    /// Identifiers of the effective permissions.
    #[must_use]
    pub fn permission_ids(&self) -> BTreeSet<PermissionId> {
        self.permissions.iter().map(Permission::id).collect()
    }

    /// Effective permissions grouped by resource.
    #[must_use]
    pub fn grouped_by_resource(&self) -> BTreeMap<String, Vec<Permission>> {
        group_by_resource(self.permissions.iter())
    }

    /// Number of effective permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns whether the user holds no permissions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

/// Computes effective permissions from roles, role grants and overrides.
///
/// The resolver holds no state of its own apart from the optional cache.
/// Store failures are returned unchanged; they are never read as "no
/// permissions".
#[derive(Clone)]
pub struct PermissionResolver {
    catalog: Arc<dyn PermissionCatalog>,
    role_grants: Arc<dyn RoleGrantStore>,
    overrides: Arc<dyn UserOverrideStore>,
    user_roles: Arc<dyn UserRoleRepository>,
    cache: Option<Arc<ResolutionCache>>,
}

impl PermissionResolver {
    /// Creates a resolver without a cache.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn PermissionCatalog>,
        role_grants: Arc<dyn RoleGrantStore>,
        overrides: Arc<dyn UserOverrideStore>,
        user_roles: Arc<dyn UserRoleRepository>,
    ) -> Self {
        Self {
            catalog,
            role_grants,
            overrides,
            user_roles,
            cache: None,
        }
    }

    /// Enables memoization through `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ResolutionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Returns the cache, if one is configured.
    #[must_use]
    pub fn cache(&self) -> Option<&Arc<ResolutionCache>> {
        self.cache.as_ref()
    }

    pub(crate) fn catalog(&self) -> &Arc<dyn PermissionCatalog> {
        &self.catalog
    }

    pub(crate) fn role_grant_store(&self) -> &Arc<dyn RoleGrantStore> {
        &self.role_grants
    }

    pub(crate) fn override_store(&self) -> &Arc<dyn UserOverrideStore> {
        &self.overrides
    }

    /// Computes the effective permission set of a user.
    ///
    /// Granted ids missing from the catalog are skipped and logged.
    pub async fn compute_effective(&self, user_id: UserId) -> AppResult<EffectivePermissions> {
        let resolution = self.resolve(user_id).await?;
        let (mut permissions, skipped) = self
            .resolve_permissions(resolution.permission_ids().iter().copied())
            .await?;

        if !skipped.is_empty() {
            warn!(
                user_id = %user_id,
                skipped = skipped.len(),
                "effective permissions reference ids missing from the catalog"
            );
        }

        sort_permissions(&mut permissions);
        Ok(EffectivePermissions {
            user_id,
            permissions,
            skipped,
        })
    }

    /// Returns whether the user holds `(action, resource)`.
    ///
    /// Always agrees with membership in [`Self::compute_effective`].
    pub async fn has_permission(
        &self,
        user_id: UserId,
        action: &str,
        resource: &str,
    ) -> AppResult<bool> {
        Ok(self.decide(user_id, action, resource).await?.granted)
    }

    /// Decides and explains one `(action, resource)` check.
    pub async fn decide(
        &self,
        user_id: UserId,
        action: &str,
        resource: &str,
    ) -> AppResult<PermissionDecision> {
        let key = PermissionKey::new(action, resource)?;
        let Some(permission) = self.catalog.find_permission_by_key(&key).await? else {
            debug!(user_id = %user_id, permission = %key, "permission is not in the catalog");
            return Ok(PermissionDecision {
                key,
                permission_id: None,
                granted: false,
                source: DecisionSource::UnknownPermission,
            });
        };

        let source = if self.cache.is_some() {
            self.resolve(user_id).await?.decide(permission.id())
        } else {
            let (role_grants, overrides) = self.read_inputs(user_id).await?;
            decide(permission.id(), &role_grants, &overrides)
        };

        Ok(PermissionDecision {
            key,
            permission_id: Some(permission.id()),
            granted: source.is_granted(),
            source: DecisionSource::Resolved { source },
        })
    }

    /// Fails with `Forbidden` unless the user holds `(action, resource)`.
    pub async fn require_permission(
        &self,
        user_id: UserId,
        action: &str,
        resource: &str,
    ) -> AppResult<()> {
        let decision = self.decide(user_id, action, resource).await?;
        if decision.granted {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "user '{user_id}' is missing permission '{}'",
            decision.key
        )))
    }

    /// Resolves catalog permissions for ids, returning the ids the catalog lacks.
    pub(crate) async fn resolve_permissions(
        &self,
        permission_ids: impl Iterator<Item = PermissionId> + Send,
    ) -> AppResult<(Vec<Permission>, Vec<PermissionId>)> {
        let mut permissions = Vec::new();
        let mut skipped = Vec::new();

        for permission_id in permission_ids {
            match self.catalog.find_permission(permission_id).await? {
                Some(permission) => permissions.push(permission),
                None => {
                    warn!(
                        permission_id = %permission_id,
                        "skipping permission id missing from the catalog"
                    );
                    skipped.push(permission_id);
                }
            }
        }

        Ok((permissions, skipped))
    }

    async fn resolve(&self, user_id: UserId) -> AppResult<Arc<UserResolution>> {
        let Some(cache) = &self.cache else {
            let (role_grants, overrides) = self.read_inputs(user_id).await?;
            return Ok(Arc::new(UserResolution::new(user_id, role_grants, overrides)));
        };

        // Role membership is not versioned; a hit must match the current roles.
        let tag = cache.current_tag(user_id);
        let roles = self.user_roles.roles_for_user(user_id).await?;

        if let Some(resolution) = cache.get(user_id).await {
            if resolution.roles().eq(roles.iter().copied()) {
                return Ok(resolution);
            }
            debug!(user_id = %user_id, "role membership changed since resolution was cached");
        }

        let (role_grants, overrides) = self.read_inputs_for_roles(user_id, roles).await?;
        let resolution = Arc::new(UserResolution::new(user_id, role_grants, overrides));
        cache.put(user_id, resolution.clone(), tag).await;

        Ok(resolution)
    }

    async fn read_inputs(&self, user_id: UserId) -> AppResult<(RoleGrantSets, OverrideMap)> {
        let roles = self.user_roles.roles_for_user(user_id).await?;
        self.read_inputs_for_roles(user_id, roles).await
    }

    async fn read_inputs_for_roles(
        &self,
        user_id: UserId,
        roles: BTreeSet<Role>,
    ) -> AppResult<(RoleGrantSets, OverrideMap)> {
        let mut role_grants = RoleGrantSets::new();
        for role in roles {
            let grants = self.role_grants.grants_for_role(role).await?;
            role_grants.insert(role, grants);
        }

        let overrides = self.overrides.overrides_for_user(user_id).await?;
        Ok((role_grants, overrides))
    }
}

#[cfg(test)]
mod tests;
