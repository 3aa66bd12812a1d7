use std::fmt::{Display, Formatter};
use std::str::FromStr;

use maintly_core::AppError;
use serde::{Deserialize, Serialize};

/// Application role attached to users and to role grants.
///
/// The set is closed and flat: no role inherits another role's grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Operator of the whole platform.
    SystemAdmin,
    /// Tenant administrator.
    Admin,
    /// Maintenance manager.
    Manager,
    /// Field technician.
    Technician,
    /// External contractor.
    Contractor,
}

impl Role {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemAdmin => "system_admin",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Technician => "technician",
            Self::Contractor => "contractor",
        }
    }

    /// Returns the display label used by administrative screens.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::SystemAdmin => "System Admin",
            Self::Admin => "Admin",
            Self::Manager => "Manager",
            Self::Technician => "Technician",
            Self::Contractor => "Contractor",
        }
    }

    /// Returns all known roles.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Role] = &[
            Role::SystemAdmin,
            Role::Admin,
            Role::Manager,
            Role::Technician,
            Role::Contractor,
        ];

        ALL
    }

    /// Parses a transport value into a role.
    pub fn from_transport(value: &str) -> Result<Self, AppError> {
        Self::from_str(value)
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "system_admin" => Ok(Self::SystemAdmin),
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "technician" => Ok(Self::Technician),
            "contractor" => Ok(Self::Contractor),
            _ => Err(AppError::Validation(format!("unknown role value '{value}'"))),
        }
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}
