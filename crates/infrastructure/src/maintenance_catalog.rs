//! Baseline maintenance catalog and default role grants.
//!
//! The PostgreSQL migrations seed the same rows; the in-memory backend builds
//! its stores from these tables at startup.

use std::collections::BTreeSet;

use maintly_core::AppResult;
use maintly_domain::{
    MANAGE_PERMISSIONS_ACTION, PERMISSIONS_RESOURCE, Permission, PermissionId, PermissionKey, Role,
};

use crate::InMemoryPermissionCatalog;

const CRUD: &[&str] = &["view", "create", "edit", "delete"];

/// Resources that carry the full view/create/edit/delete action set.
pub const MAINTENANCE_RESOURCES: &[&str] = &[
    "assets",
    "checklists",
    "companies",
    "locations",
    "time_records",
    "users",
    "work_orders",
    "work_requests",
];

const MANAGER_GRANTS: &[(&str, &str)] = &[
    ("view", "assets"),
    ("create", "assets"),
    ("edit", "assets"),
    ("view", "checklists"),
    ("create", "checklists"),
    ("edit", "checklists"),
    ("delete", "checklists"),
    ("view", "companies"),
    ("create", "companies"),
    ("edit", "companies"),
    ("view", "locations"),
    ("create", "locations"),
    ("edit", "locations"),
    ("view", "time_records"),
    ("create", "time_records"),
    ("edit", "time_records"),
    ("view", "users"),
    ("view", "work_orders"),
    ("create", "work_orders"),
    ("edit", "work_orders"),
    ("delete", "work_orders"),
    ("view", "work_requests"),
    ("create", "work_requests"),
    ("edit", "work_requests"),
    ("delete", "work_requests"),
    ("view", "permissions"),
];

const TECHNICIAN_GRANTS: &[(&str, &str)] = &[
    ("view", "assets"),
    ("view", "checklists"),
    ("view", "companies"),
    ("view", "locations"),
    ("view", "time_records"),
    ("create", "time_records"),
    ("edit", "time_records"),
    ("view", "work_orders"),
    ("create", "work_orders"),
    ("edit", "work_orders"),
    ("view", "work_requests"),
    ("create", "work_requests"),
];

const CONTRACTOR_GRANTS: &[(&str, &str)] = &[
    ("view", "assets"),
    ("view", "time_records"),
    ("create", "time_records"),
    ("view", "work_orders"),
    ("edit", "work_orders"),
];

/// Builds the baseline catalog with fresh identifiers.
pub fn maintenance_catalog() -> AppResult<InMemoryPermissionCatalog> {
    let mut permissions = Vec::new();
    for resource in MAINTENANCE_RESOURCES {
        for action in CRUD {
            permissions.push(Permission::new(
                PermissionId::new(),
                action,
                resource,
                Some(format!("{} {}", capitalize(action), resource.replace('_', " "))),
            )?);
        }
    }
    permissions.push(Permission::new(
        PermissionId::new(),
        "view",
        PERMISSIONS_RESOURCE,
        Some("View role and user permissions".to_owned()),
    )?);
    permissions.push(Permission::new(
        PermissionId::new(),
        MANAGE_PERMISSIONS_ACTION,
        PERMISSIONS_RESOURCE,
        Some("Edit role grants and user overrides".to_owned()),
    )?);

    InMemoryPermissionCatalog::new(permissions)
}

/// Returns the default grant keys of a role.
///
/// `system_admin` and `admin` hold the whole catalog.
pub fn default_role_grants(role: Role, catalog: &[Permission]) -> AppResult<BTreeSet<PermissionId>> {
    let keys = match role {
        Role::SystemAdmin | Role::Admin => {
            return Ok(catalog.iter().map(Permission::id).collect());
        }
        Role::Manager => MANAGER_GRANTS,
        Role::Technician => TECHNICIAN_GRANTS,
        Role::Contractor => CONTRACTOR_GRANTS,
    };

    let mut grants = BTreeSet::new();
    for (action, resource) in keys {
        let key = PermissionKey::new(action, resource)?;
        if let Some(permission) = catalog.iter().find(|permission| permission.key() == &key) {
            grants.insert(permission.id());
        }
    }

    Ok(grants)
}

fn capitalize(value: &str) -> String {
    let mut characters = value.chars();
    match characters.next() {
        Some(first) => first.to_uppercase().chain(characters).collect(),
        None => String::new(),
    }
}
