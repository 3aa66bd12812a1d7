//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_permission_catalog;
mod in_memory_role_grant_store;
mod in_memory_user_override_store;
mod in_memory_user_role_repository;
mod maintenance_catalog;
mod permission_change_sinks;
mod postgres_permission_catalog;
mod postgres_role_grant_store;
mod postgres_store_error;
mod postgres_user_override_store;
mod postgres_user_role_repository;

pub use in_memory_permission_catalog::InMemoryPermissionCatalog;
pub use in_memory_role_grant_store::InMemoryRoleGrantStore;
pub use in_memory_user_override_store::InMemoryUserOverrideStore;
pub use in_memory_user_role_repository::InMemoryUserRoleRepository;
pub use maintenance_catalog::{MAINTENANCE_RESOURCES, default_role_grants, maintenance_catalog};
pub use permission_change_sinks::{InMemoryPermissionChangeLog, TracingPermissionChangeSink};
pub use postgres_permission_catalog::load_permission_catalog;
pub use postgres_role_grant_store::PostgresRoleGrantStore;
pub use postgres_user_override_store::PostgresUserOverrideStore;
pub use postgres_user_role_repository::PostgresUserRoleRepository;
