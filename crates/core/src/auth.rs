use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, AppResult, TenantId};

/// Authenticated actor forwarded by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    subject: String,
    tenant_id: TenantId,
}

impl UserIdentity {
    /// Creates an identity from a subject claim and its tenant.
    #[must_use]
    pub fn new(subject: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            subject: subject.into(),
            tenant_id,
        }
    }

    /// Returns the stable subject claim from the identity provider.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the tenant linked to the identity.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Parses the subject as the UUID of a user record.
    pub fn subject_uuid(&self) -> AppResult<Uuid> {
        Uuid::parse_str(self.subject.as_str()).map_err(|error| {
            AppError::Unauthorized(format!(
                "subject '{}' is not a user identifier: {error}",
                self.subject
            ))
        })
    }
}
