use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use maintly_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a catalog permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses a transport value into a permission identifier.
    pub fn from_transport(value: &str) -> AppResult<Self> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid permission id '{value}': {error}")))
    }
}

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PermissionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Natural key of a permission: the `(action, resource)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionKey {
    action: String,
    resource: String,
}

impl PermissionKey {
    /// Creates a normalized key. Both parts are trimmed and lower-cased.
    pub fn new(action: &str, resource: &str) -> AppResult<Self> {
        let action = NonEmptyString::new(action.trim().to_lowercase())
            .map_err(|_| AppError::Validation("permission action must not be empty".to_owned()))?;
        let resource = NonEmptyString::new(resource.trim().to_lowercase()).map_err(|_| {
            AppError::Validation("permission resource must not be empty".to_owned())
        })?;

        Ok(Self {
            action: action.into(),
            resource: resource.into(),
        })
    }

    /// Returns the action part.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Returns the resource part.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.resource.as_str()
    }
}

impl Display for PermissionKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.action, self.resource)
    }
}

/// Catalog permission: one action on one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    id: PermissionId,
    key: PermissionKey,
    description: Option<String>,
}

impl Permission {
    /// Creates a validated permission definition.
    pub fn new(
        id: PermissionId,
        action: &str,
        resource: &str,
        description: Option<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            key: PermissionKey::new(action, resource)?,
            description: description
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
        })
    }

    /// Returns the permission identifier.
    #[must_use]
    pub fn id(&self) -> PermissionId {
        self.id
    }

    /// Returns the `(action, resource)` key.
    #[must_use]
    pub fn key(&self) -> &PermissionKey {
        &self.key
    }

    /// Returns the action part.
    #[must_use]
    pub fn action(&self) -> &str {
        self.key.action()
    }

    /// Returns the resource part.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.key.resource()
    }

    /// Returns the optional human readable description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Orders permissions by resource, then action.
pub fn sort_permissions(permissions: &mut [Permission]) {
    permissions.sort_by(|left, right| {
        left.resource()
            .cmp(right.resource())
            .then_with(|| left.action().cmp(right.action()))
    });
}

/// Groups permissions by resource for presentation.
///
/// Groups are ordered by resource name and each group by action.
#[must_use]
pub fn group_by_resource<'a, I>(permissions: I) -> BTreeMap<String, Vec<Permission>>
where
    I: IntoIterator<Item = &'a Permission>,
{
    let mut groups: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
    for permission in permissions {
        groups
            .entry(permission.resource().to_owned())
            .or_default()
            .push(permission.clone());
    }

    for group in groups.values_mut() {
        group.sort_by(|left, right| left.action().cmp(right.action()));
    }

    groups
}
