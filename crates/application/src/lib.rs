//! Application services and ports.

#![forbid(unsafe_code)]

mod permission_admin_service;
mod permission_ports;
mod permission_resolver;
mod resolution_cache;

#[cfg(test)]
mod test_support;

pub use permission_admin_service::{OverrideEntry, PermissionAdminService, ToggleOutcome};
pub use permission_ports::{
    ChangeTarget, PermissionCatalog, PermissionChange, PermissionChangeEvent,
    PermissionChangeSink, RoleGrantStore, SetOverrideInput, ToggleOverrideInput,
    UserOverrideStore, UserRoleRepository,
};
pub use permission_resolver::{
    DecisionSource, EffectivePermissions, PermissionDecision, PermissionResolver, UserResolution,
};
pub use resolution_cache::{ResolutionCache, VersionTag};
