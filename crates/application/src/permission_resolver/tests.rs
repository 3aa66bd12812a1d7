use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;

use maintly_core::{AppError, AppResult, StoreKind, TenantId};
use maintly_domain::{GrantSource, PermissionId, Role, UserId};

use crate::test_support::{FakeCatalog, FakeOverrideStore, Fixture, must, permission};
use crate::{
    DecisionSource, PermissionResolver, ResolutionCache, RoleGrantStore, SetOverrideInput,
    UserOverrideStore, UserRoleRepository,
};

async fn set_override(
    fixture: &Fixture,
    user_id: UserId,
    permission_id: PermissionId,
    granted: bool,
) {
    must(
        fixture
            .overrides
            .set_override(SetOverrideInput {
                user_id,
                permission_id,
                granted,
                tenant_id: TenantId::new(),
                created_by: None,
            })
            .await,
    );
}

/// Fixture after scenario 1: `manager` holds create:work_orders and view:assets.
async fn manager_fixture() -> (Fixture, UserId) {
    let fixture = Fixture::new();
    fixture
        .role_grants
        .seed(
            Role::Manager,
            [fixture.create_work_orders.id(), fixture.view_assets.id()],
        )
        .await;
    let user_id = UserId::new();
    fixture.user_roles.assign(user_id, Role::Manager).await;
    (fixture, user_id)
}

#[tokio::test]
async fn manager_holds_role_grants_only() {
    let (fixture, user_id) = manager_fixture().await;
    let resolver = fixture.resolver();

    assert!(must(resolver.has_permission(user_id, "create", "work_orders").await));
    assert!(!must(resolver.has_permission(user_id, "delete", "assets").await));
}

#[tokio::test]
async fn grant_override_adds_a_permission() {
    let (fixture, user_id) = manager_fixture().await;
    let resolver = fixture.resolver();

    set_override(&fixture, user_id, fixture.delete_assets.id(), true).await;

    assert!(must(resolver.has_permission(user_id, "delete", "assets").await));
    let effective = must(resolver.compute_effective(user_id).await);
    assert_eq!(effective.len(), 3);
    assert!(effective.contains("delete", "assets"));
}

#[tokio::test]
async fn replaced_grants_are_visible_on_the_next_read_with_a_cache() {
    let (fixture, user_id) = manager_fixture().await;
    let resolver = fixture.cached_resolver();
    assert!(must(resolver.has_permission(user_id, "view", "assets").await));

    must(
        fixture
            .role_grants
            .replace_grants(Role::Manager, BTreeSet::from([fixture.create_work_orders.id()]))
            .await,
    );
    if let Some(cache) = resolver.cache() {
        cache.invalidate_role(Role::Manager);
    }

    assert!(!must(resolver.has_permission(user_id, "view", "assets").await));
}

#[tokio::test]
async fn roles_are_unioned_and_overrides_beat_the_union() {
    let (fixture, user_id) = manager_fixture().await;
    fixture
        .role_grants
        .seed(Role::Manager, [fixture.create_work_orders.id()])
        .await;
    fixture
        .role_grants
        .seed(Role::Technician, [fixture.view_assets.id()])
        .await;
    fixture.user_roles.assign(user_id, Role::Technician).await;
    let resolver = fixture.resolver();

    let decision = must(resolver.decide(user_id, "view", "assets").await);
    assert!(decision.granted);
    assert_eq!(
        decision.source,
        DecisionSource::Resolved {
            source: GrantSource::Roles {
                roles: vec![Role::Technician]
            }
        }
    );

    set_override(&fixture, user_id, fixture.view_assets.id(), false).await;

    let decision = must(resolver.decide(user_id, "view", "assets").await);
    assert!(!decision.granted);
    assert_eq!(
        decision.source,
        DecisionSource::Resolved {
            source: GrantSource::Override { granted: false }
        }
    );
    assert!(!must(resolver.compute_effective(user_id).await).contains("view", "assets"));
}

#[tokio::test]
async fn clearing_a_revoke_restores_the_role_grant() {
    let (fixture, user_id) = manager_fixture().await;
    let resolver = fixture.resolver();
    let view_assets = fixture.view_assets.id();

    set_override(&fixture, user_id, view_assets, false).await;
    assert!(!must(resolver.has_permission(user_id, "view", "assets").await));

    must(fixture.overrides.clear_override(user_id, view_assets).await);
    assert!(must(resolver.has_permission(user_id, "view", "assets").await));
}

#[tokio::test]
async fn user_without_roles_holds_nothing() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver();
    let user_id = UserId::new();

    assert!(must(resolver.compute_effective(user_id).await).is_empty());
    assert!(!must(resolver.has_permission(user_id, "view", "assets").await));
}

#[tokio::test]
async fn unknown_permission_is_denied_without_error() {
    let (fixture, user_id) = manager_fixture().await;
    let resolver = fixture.resolver();

    let decision = must(resolver.decide(user_id, "launch", "rockets").await);

    assert!(!decision.granted);
    assert_eq!(decision.permission_id, None);
    assert_eq!(decision.source, DecisionSource::UnknownPermission);
}

#[tokio::test]
async fn blank_action_is_rejected() {
    let (fixture, user_id) = manager_fixture().await;
    let resolver = fixture.resolver();

    let result = resolver.has_permission(user_id, "  ", "assets").await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn require_permission_forbids_missing_grant() {
    let (fixture, user_id) = manager_fixture().await;
    let resolver = fixture.resolver();

    assert!(resolver.require_permission(user_id, "view", "assets").await.is_ok());
    let result = resolver.require_permission(user_id, "delete", "assets").await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn store_failure_is_not_read_as_no_permissions() {
    let (fixture, user_id) = manager_fixture().await;
    let resolver = fixture.resolver();
    fixture.role_grants.set_unavailable(true);

    let check = resolver.has_permission(user_id, "view", "assets").await;
    let effective = resolver.compute_effective(user_id).await;

    assert!(matches!(
        check,
        Err(AppError::StoreUnavailable {
            store: StoreKind::RoleGrants,
            ..
        })
    ));
    assert!(matches!(effective, Err(error) if error.is_store_unavailable()));
}

#[tokio::test]
async fn grants_missing_from_the_catalog_are_skipped() {
    let (fixture, user_id) = manager_fixture().await;
    let retired = PermissionId::new();
    fixture
        .role_grants
        .seed(
            Role::Manager,
            [fixture.create_work_orders.id(), retired],
        )
        .await;
    let resolver = fixture.resolver();

    let effective = must(resolver.compute_effective(user_id).await);

    assert_eq!(effective.len(), 1);
    assert_eq!(effective.skipped(), &[retired]);
    assert!(effective.contains("create", "work_orders"));
}

#[tokio::test]
async fn effective_permissions_are_ordered_by_resource_then_action() {
    let (fixture, user_id) = manager_fixture().await;
    set_override(&fixture, user_id, fixture.delete_assets.id(), true).await;
    let resolver = fixture.resolver();

    let effective = must(resolver.compute_effective(user_id).await);
    let keys: Vec<String> = effective.keys().map(ToString::to_string).collect();

    assert_eq!(
        keys,
        vec!["delete:assets", "view:assets", "create:work_orders"]
    );
    assert_eq!(effective.grouped_by_resource().len(), 2);
}

#[tokio::test]
async fn cached_resolution_is_reused_until_invalidated() {
    let (fixture, user_id) = manager_fixture().await;
    let cache = Arc::new(ResolutionCache::new());
    let resolver = fixture.resolver().with_cache(cache.clone());

    must(resolver.compute_effective(user_id).await);
    assert!(cache.get(user_id).await.is_some());

    set_override(&fixture, user_id, fixture.create_work_orders.id(), false).await;
    cache.invalidate(user_id);

    assert!(!must(resolver.has_permission(user_id, "create", "work_orders").await));
}

#[tokio::test]
async fn cached_resolution_follows_role_assignment() {
    let (fixture, user_id) = manager_fixture().await;
    fixture
        .role_grants
        .seed(Role::Technician, [fixture.delete_assets.id()])
        .await;
    let uncached = fixture.resolver();
    let cached = fixture.cached_resolver();
    assert!(!must(cached.has_permission(user_id, "delete", "assets").await));

    fixture.user_roles.assign(user_id, Role::Technician).await;

    assert!(must(uncached.has_permission(user_id, "delete", "assets").await));
    assert!(must(cached.has_permission(user_id, "delete", "assets").await));
    let effective = must(cached.compute_effective(user_id).await);
    assert!(effective.contains("delete", "assets"));
}

#[tokio::test]
async fn cached_resolution_drops_grants_of_a_removed_role() {
    let (fixture, user_id) = manager_fixture().await;
    let cached = fixture.cached_resolver();
    assert!(must(cached.has_permission(user_id, "create", "work_orders").await));

    fixture.user_roles.unassign(user_id, Role::Manager).await;

    assert!(!must(cached.has_permission(user_id, "create", "work_orders").await));
    assert!(must(cached.compute_effective(user_id).await).is_empty());
}

struct UnavailableUserRoles;

#[async_trait]
impl UserRoleRepository for UnavailableUserRoles {
    async fn roles_for_user(&self, _user_id: UserId) -> AppResult<BTreeSet<Role>> {
        Err(AppError::store_unavailable(StoreKind::UserRoles, "timeout"))
    }
}

#[tokio::test]
async fn user_role_failure_carries_its_store_tag() {
    let fixture = Fixture::new();
    let resolver = PermissionResolver::new(
        fixture.catalog.clone(),
        fixture.role_grants.clone(),
        fixture.overrides.clone(),
        Arc::new(UnavailableUserRoles),
    );

    let result = resolver.compute_effective(UserId::new()).await;

    assert!(matches!(
        result,
        Err(AppError::StoreUnavailable {
            store: StoreKind::UserRoles,
            ..
        })
    ));
}

#[derive(Debug, Clone)]
struct Layout {
    roles: Vec<(Role, Vec<usize>)>,
    overrides: Vec<(usize, bool)>,
}

fn layout() -> impl Strategy<Value = Layout> {
    let role = prop::sample::select(Role::all().to_vec());
    (
        prop::collection::vec((role, prop::collection::vec(0usize..6, 0..6)), 0..4),
        prop::collection::vec((0usize..6, any::<bool>()), 0..6),
    )
        .prop_map(|(roles, overrides)| Layout { roles, overrides })
}

async fn observe(resolver: &PermissionResolver, user_id: UserId) -> (Vec<String>, Vec<bool>) {
    let effective = must(resolver.compute_effective(user_id).await);
    let keys = effective.keys().map(ToString::to_string).collect();
    let mut checks = Vec::new();
    for index in 0..6 {
        let resource = format!("resource_{index}");
        checks.push(must(resolver.has_permission(user_id, "use", &resource).await));
    }
    (keys, checks)
}

async fn check_layout(layout: Layout) {
    let permissions: Vec<_> = (0..6)
        .map(|index| permission("use", &format!("resource_{index}")))
        .collect();
    let mut fixture = Fixture::new();
    fixture.catalog = Arc::new(FakeCatalog::new(permissions.clone()));
    fixture.overrides = Arc::new(FakeOverrideStore::new(
        permissions.iter().map(|permission| permission.id()),
    ));
    let user_id = UserId::new();

    for (role, indices) in &layout.roles {
        fixture
            .role_grants
            .seed(*role, indices.iter().map(|index| permissions[*index].id()))
            .await;
        fixture.user_roles.assign(user_id, *role).await;
    }
    for (index, granted) in &layout.overrides {
        set_override(&fixture, user_id, permissions[*index].id(), *granted).await;
    }

    let uncached = fixture.resolver();
    let cached = fixture.cached_resolver();
    let (keys, checks) = observe(&uncached, user_id).await;

    for (index, granted) in checks.iter().enumerate() {
        let key = format!("use:resource_{index}");
        assert_eq!(*granted, keys.contains(&key), "{key}");
    }
    // Second cached pass is served from the cache.
    assert_eq!(observe(&cached, user_id).await, (keys.clone(), checks.clone()));
    assert_eq!(observe(&cached, user_id).await, (keys, checks));
}

proptest! {
    #[test]
    fn checks_match_effective_set_with_and_without_cache(layout in layout()) {
        let runtime = match tokio::runtime::Builder::new_current_thread().build() {
            Ok(runtime) => runtime,
            Err(error) => panic!("failed to build runtime: {error}"),
        };
        runtime.block_on(check_layout(layout));
    }
}
