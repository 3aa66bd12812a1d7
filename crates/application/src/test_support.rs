//! Fake port implementations shared by the application tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use maintly_core::{AppError, AppResult, StoreKind, TenantId, UserIdentity};
use maintly_domain::{
    MANAGE_PERMISSIONS_ACTION, OverrideMap, OverrideState, PERMISSIONS_RESOURCE, Permission,
    PermissionId, PermissionKey, Role, UserId, UserPermissionOverride, sort_permissions,
};

use crate::{
    PermissionCatalog, PermissionChangeEvent, PermissionChangeSink, PermissionResolver,
    ResolutionCache, RoleGrantStore, SetOverrideInput, ToggleOverrideInput, UserOverrideStore,
    UserRoleRepository,
};

pub(crate) fn permission(action: &str, resource: &str) -> Permission {
    match Permission::new(PermissionId::new(), action, resource, None) {
        Ok(permission) => permission,
        Err(error) => panic!("invalid test permission {action}:{resource}: {error}"),
    }
}

pub(crate) fn must<T>(result: AppResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(error) => panic!("unexpected error: {error}"),
    }
}

pub(crate) struct FakeCatalog {
    permissions: Vec<Permission>,
}

impl FakeCatalog {
    pub(crate) fn new(permissions: Vec<Permission>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl PermissionCatalog for FakeCatalog {
    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let mut permissions = self.permissions.clone();
        sort_permissions(&mut permissions);
        Ok(permissions)
    }

    async fn find_permission(&self, permission_id: PermissionId) -> AppResult<Option<Permission>> {
        Ok(self
            .permissions
            .iter()
            .find(|permission| permission.id() == permission_id)
            .cloned())
    }

    async fn find_permission_by_key(
        &self,
        key: &PermissionKey,
    ) -> AppResult<Option<Permission>> {
        Ok(self
            .permissions
            .iter()
            .find(|permission| permission.key() == key)
            .cloned())
    }
}

/// Grant store that validates ids against a fixed id list.
pub(crate) struct FakeRoleGrantStore {
    known: BTreeSet<PermissionId>,
    grants: Mutex<HashMap<Role, BTreeSet<PermissionId>>>,
    unavailable: AtomicBool,
}

impl FakeRoleGrantStore {
    pub(crate) fn new(known: impl IntoIterator<Item = PermissionId>) -> Self {
        Self {
            known: known.into_iter().collect(),
            grants: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub(crate) async fn seed(&self, role: Role, grants: impl IntoIterator<Item = PermissionId>) {
        self.grants
            .lock()
            .await
            .insert(role, grants.into_iter().collect());
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable(
                StoreKind::RoleGrants,
                "connection refused",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RoleGrantStore for FakeRoleGrantStore {
    async fn grants_for_role(&self, role: Role) -> AppResult<BTreeSet<PermissionId>> {
        self.check_available()?;
        Ok(self
            .grants
            .lock()
            .await
            .get(&role)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_grants(
        &self,
        role: Role,
        permission_ids: BTreeSet<PermissionId>,
    ) -> AppResult<BTreeSet<PermissionId>> {
        self.check_available()?;
        if let Some(unknown) = permission_ids.iter().find(|id| !self.known.contains(id)) {
            return Err(AppError::InvalidPermission(format!(
                "permission '{unknown}' is not in the catalog"
            )));
        }

        Ok(self
            .grants
            .lock()
            .await
            .insert(role, permission_ids)
            .unwrap_or_default())
    }
}

pub(crate) struct FakeOverrideStore {
    known: BTreeSet<PermissionId>,
    rows: Mutex<HashMap<(UserId, PermissionId), UserPermissionOverride>>,
}

impl FakeOverrideStore {
    pub(crate) fn new(known: impl IntoIterator<Item = PermissionId>) -> Self {
        Self {
            known: known.into_iter().collect(),
            rows: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl UserOverrideStore for FakeOverrideStore {
    async fn overrides_for_user(&self, user_id: UserId) -> AppResult<OverrideMap> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .filter(|row| row.user_id == user_id)
            .map(|row| (row.permission_id, row.granted))
            .collect())
    }

    async fn override_records_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserPermissionOverride>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn set_override(&self, input: SetOverrideInput) -> AppResult<Option<bool>> {
        if !self.known.contains(&input.permission_id) {
            return Err(AppError::InvalidPermission(format!(
                "permission '{}' is not in the catalog",
                input.permission_id
            )));
        }

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
            .lock()
            .await
            .insert((input.user_id, input.permission_id), row)
            .map(|previous| previous.granted))
    }

    async fn toggle_override(&self, input: ToggleOverrideInput) -> AppResult<Option<bool>> {
        if !self.known.contains(&input.permission_id) {
            return Err(AppError::InvalidPermission(format!(
                "permission '{}' is not in the catalog",
                input.permission_id
            )));
        }

        let mut rows = self.rows.lock().await;
        let key = (input.user_id, input.permission_id);
        let previous = rows.get(&key).map(|row| row.granted);
        // Yield while holding the rows so concurrent toggles interleave here.
        tokio::task::yield_now().await;
        rows.insert(
            key,
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
        Ok(self
            .rows
            .lock()
            .await
            .remove(&(user_id, permission_id))
            .map(|previous| previous.granted))
    }
}

#[derive(Default)]
pub(crate) struct FakeUserRoles {
    roles: Mutex<HashMap<UserId, BTreeSet<Role>>>,
}

impl FakeUserRoles {
    pub(crate) async fn assign(&self, user_id: UserId, role: Role) {
        self.roles
            .lock()
            .await
            .entry(user_id)
            .or_default()
            .insert(role);
    }

    pub(crate) async fn unassign(&self, user_id: UserId, role: Role) {
        if let Some(roles) = self.roles.lock().await.get_mut(&user_id) {
            roles.remove(&role);
        }
    }
}

#[async_trait]
impl UserRoleRepository for FakeUserRoles {
    async fn roles_for_user(&self, user_id: UserId) -> AppResult<BTreeSet<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) events: Mutex<Vec<PermissionChangeEvent>>,
    pub(crate) failing: AtomicBool,
}

#[async_trait]
impl PermissionChangeSink for RecordingSink {
    async fn publish(&self, event: PermissionChangeEvent) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Internal("audit sink offline".to_owned()));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Maintenance catalog used by the scenario tests.
pub(crate) struct Fixture {
    pub(crate) create_work_orders: Permission,
    pub(crate) view_assets: Permission,
    pub(crate) delete_assets: Permission,
    pub(crate) manage_permissions: Permission,
    pub(crate) catalog: Arc<FakeCatalog>,
    pub(crate) role_grants: Arc<FakeRoleGrantStore>,
    pub(crate) overrides: Arc<FakeOverrideStore>,
    pub(crate) user_roles: Arc<FakeUserRoles>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let create_work_orders = permission("create", "work_orders");
        let view_assets = permission("view", "assets");
        let delete_assets = permission("delete", "assets");
        let manage_permissions = permission(MANAGE_PERMISSIONS_ACTION, PERMISSIONS_RESOURCE);
        let all = vec![
            create_work_orders.clone(),
            view_assets.clone(),
            delete_assets.clone(),
            manage_permissions.clone(),
        ];
        let ids: Vec<PermissionId> = all.iter().map(Permission::id).collect();

        Self {
            create_work_orders,
            view_assets,
            delete_assets,
            manage_permissions,
            catalog: Arc::new(FakeCatalog::new(all)),
            role_grants: Arc::new(FakeRoleGrantStore::new(ids.clone())),
            overrides: Arc::new(FakeOverrideStore::new(ids)),
            user_roles: Arc::new(FakeUserRoles::default()),
        }
    }

    pub(crate) fn resolver(&self) -> PermissionResolver {
        PermissionResolver::new(
            self.catalog.clone(),
            self.role_grants.clone(),
            self.overrides.clone(),
            self.user_roles.clone(),
        )
    }

    pub(crate) fn cached_resolver(&self) -> PermissionResolver {
        self.resolver().with_cache(Arc::new(ResolutionCache::new()))
    }

    /// Creates a user holding `system_admin`, which is granted `manage:permissions`.
    pub(crate) async fn admin(&self) -> UserIdentity {
        self.role_grants
            .seed(Role::SystemAdmin, [self.manage_permissions.id()])
            .await;
        let admin_id = UserId::new();
        self.user_roles.assign(admin_id, Role::SystemAdmin).await;
        UserIdentity::new(admin_id.to_string(), TenantId::new())
    }
}
