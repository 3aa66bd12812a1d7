//! Domain entities and invariants for permission resolution.

#![forbid(unsafe_code)]

mod effective;
mod permission;
mod role;
mod security;
mod user;

pub use effective::{GrantSource, OverrideMap, RoleGrantSets, combine, decide};
pub use permission::{
    Permission, PermissionId, PermissionKey, group_by_resource, sort_permissions,
};
pub use role::Role;
pub use security::{AuditAction, MANAGE_PERMISSIONS_ACTION, PERMISSIONS_RESOURCE};
pub use user::{OverrideState, UserId, UserPermissionOverride};
