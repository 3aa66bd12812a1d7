use maintly_application::{DecisionSource, PermissionChangeEvent, PermissionDecision};
use maintly_domain::{GrantSource, Permission, PermissionId};

use super::{PermissionChangeResponse, PermissionCheckResponse, PermissionResponse};

impl From<Permission> for PermissionResponse {
    fn from(value: Permission) -> Self {
        Self {
            permission_id: value.id().to_string(),
            action: value.action().to_owned(),
            resource: value.resource().to_owned(),
            key: value.key().to_string(),
            description: value.description().map(ToOwned::to_owned),
        }
    }
}

impl From<PermissionDecision> for PermissionCheckResponse {
    fn from(value: PermissionDecision) -> Self {
        let (source, granting_roles) = match value.source {
            DecisionSource::UnknownPermission => ("unknown_permission", Vec::new()),
            DecisionSource::Resolved { source } => match source {
                GrantSource::Override { .. } => ("override", Vec::new()),
                GrantSource::Roles { roles } => (
                    "roles",
                    roles.iter().map(|role| role.as_str().to_owned()).collect(),
                ),
                GrantSource::NotGranted => ("not_granted", Vec::new()),
            },
        };

        Self {
            action: value.key.action().to_owned(),
            resource: value.key.resource().to_owned(),
            permission_id: value.permission_id.map(|id| id.to_string()),
            granted: value.granted,
            source: source.to_owned(),
            granting_roles,
        }
    }
}

impl From<PermissionChangeEvent> for PermissionChangeResponse {
    fn from(value: PermissionChangeEvent) -> Self {
        Self {
            action: value.change.audit_action().as_str().to_owned(),
            actor: value.actor.clone(),
            tenant_id: value.tenant_id.to_string(),
            target: value.change.target().to_string(),
            summary: value.summary(),
            added_permission_ids: id_strings(value.change.added()),
            removed_permission_ids: id_strings(value.change.removed()),
            occurred_at: value.occurred_at.to_rfc3339(),
        }
    }
}

fn id_strings(ids: impl IntoIterator<Item = PermissionId>) -> Vec<String> {
    ids.into_iter().map(|id| id.to_string()).collect()
}
