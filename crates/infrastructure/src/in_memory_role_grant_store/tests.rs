use std::collections::BTreeSet;
use std::sync::Arc;

use maintly_application::RoleGrantStore;
use maintly_core::AppError;
use maintly_domain::{Permission, PermissionId, Role};

use crate::InMemoryPermissionCatalog;

use super::InMemoryRoleGrantStore;

fn catalog_with(count: usize) -> (Arc<InMemoryPermissionCatalog>, Vec<PermissionId>) {
    let permissions: Vec<Permission> = (0..count)
        .map(|index| {
            match Permission::new(PermissionId::new(), "view", &format!("resource_{index}"), None)
            {
                Ok(permission) => permission,
                Err(error) => panic!("invalid test permission: {error}"),
            }
        })
        .collect();
    let ids = permissions.iter().map(Permission::id).collect();

    match InMemoryPermissionCatalog::new(permissions) {
        Ok(catalog) => (Arc::new(catalog), ids),
        Err(error) => panic!("catalog should build: {error}"),
    }
}

#[tokio::test]
async fn replace_is_total_and_returns_the_previous_set() {
    let (catalog, ids) = catalog_with(3);
    let store = InMemoryRoleGrantStore::new(catalog);
    store.seed(Role::Manager, [ids[0], ids[1]]).await;

    let previous = store
        .replace_grants(Role::Manager, BTreeSet::from([ids[2]]))
        .await;

    assert_eq!(previous.ok(), Some(BTreeSet::from([ids[0], ids[1]])));
    assert_eq!(
        store.grants_for_role(Role::Manager).await.ok(),
        Some(BTreeSet::from([ids[2]]))
    );
}

#[tokio::test]
async fn replacing_twice_with_the_same_set_is_stable() {
    let (catalog, ids) = catalog_with(2);
    let store = InMemoryRoleGrantStore::new(catalog);
    let grants = BTreeSet::from([ids[0], ids[1]]);

    let first = store.replace_grants(Role::Technician, grants.clone()).await;
    let second = store.replace_grants(Role::Technician, grants.clone()).await;

    assert_eq!(first.ok(), Some(BTreeSet::new()));
    assert_eq!(second.ok(), Some(grants.clone()));
    assert_eq!(store.grants_for_role(Role::Technician).await.ok(), Some(grants));
}

#[tokio::test]
async fn unknown_ids_reject_the_whole_write() {
    let (catalog, ids) = catalog_with(1);
    let store = InMemoryRoleGrantStore::new(catalog);
    store.seed(Role::Contractor, [ids[0]]).await;

    let result = store
        .replace_grants(Role::Contractor, BTreeSet::from([ids[0], PermissionId::new()]))
        .await;

    assert!(matches!(result, Err(AppError::InvalidPermission(_))));
    assert_eq!(
        store.grants_for_role(Role::Contractor).await.ok(),
        Some(BTreeSet::from([ids[0]]))
    );
}

#[tokio::test]
async fn roles_are_independent() {
    let (catalog, ids) = catalog_with(1);
    let store = InMemoryRoleGrantStore::new(catalog);

    let result = store
        .replace_grants(Role::Admin, BTreeSet::from([ids[0]]))
        .await;

    assert!(result.is_ok());
    assert_eq!(store.grants_for_role(Role::Manager).await.ok(), Some(BTreeSet::new()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_never_observe_a_partial_set() {
    let (catalog, ids) = catalog_with(8);
    let store = Arc::new(InMemoryRoleGrantStore::new(catalog));
    let before: BTreeSet<PermissionId> = ids[..4].iter().copied().collect();
    let after: BTreeSet<PermissionId> = ids[4..].iter().copied().collect();
    store.seed(Role::Manager, before.iter().copied()).await;

    let mut readers = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        let before = before.clone();
        let after = after.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..500 {
                let observed = match store.grants_for_role(Role::Manager).await {
                    Ok(observed) => observed,
                    Err(error) => panic!("read failed: {error}"),
                };
                assert!(observed == before || observed == after, "{observed:?}");
                tokio::task::yield_now().await;
            }
        }));
    }

    for round in 0..50 {
        let next = if round % 2 == 0 { &after } else { &before };
        let result = store.replace_grants(Role::Manager, next.clone()).await;
        assert!(result.is_ok());
        tokio::task::yield_now().await;
    }

    for reader in readers {
        assert!(reader.await.is_ok());
    }
}
