use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use maintly_core::{AppResult, UserIdentity};
use maintly_domain::{
    MANAGE_PERMISSIONS_ACTION, OverrideState, PERMISSIONS_RESOURCE, Permission, PermissionId, Role,
    UserId, group_by_resource, sort_permissions,
};

use crate::{
    EffectivePermissions, PermissionChange, PermissionChangeEvent, PermissionChangeSink,
    PermissionResolver, SetOverrideInput, ToggleOverrideInput,
};

/// Override row joined with its catalog permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    /// Overridden permission.
    pub permission: Permission,
    /// Explicit state of the row; never `Inherit`.
    pub state: OverrideState,
    /// Subject of the administrator that wrote the row.
    pub created_by: Option<String>,
    /// Write timestamp in RFC3339.
    pub created_at: String,
}

/// Result of toggling one override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// State after the toggle.
    pub state: OverrideState,
    /// Emitted change, `None` when nothing changed.
    pub event: Option<PermissionChangeEvent>,
}

/// Application service for the administrative permission editor.
///
/// Every write keeps the resolution cache coherent before it returns and
/// publishes a change event carrying the before and after state.
#[derive(Clone)]
pub struct PermissionAdminService {
    resolver: PermissionResolver,
    change_sink: Arc<dyn PermissionChangeSink>,
}

impl PermissionAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(resolver: PermissionResolver, change_sink: Arc<dyn PermissionChangeSink>) -> Self {
        Self {
            resolver,
            change_sink,
        }
    }

    /// Returns the resolver used for checks and reads.
    #[must_use]
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Lists every definable permission ordered by resource, then action.
    pub async fn catalog(&self) -> AppResult<Vec<Permission>> {
        self.resolver.catalog().list_permissions().await
    }

    /// Lists the catalog grouped by resource.
    pub async fn catalog_grouped_by_resource(&self) -> AppResult<BTreeMap<String, Vec<Permission>>> {
        let permissions = self.catalog().await?;
        Ok(group_by_resource(permissions.iter()))
    }

    /// Returns the catalog permissions granted to a role.
    pub async fn role_permissions(
        &self,
        actor: &UserIdentity,
        role: Role,
    ) -> AppResult<Vec<Permission>> {
        self.require_manage(actor).await?;

        let grants = self.resolver.role_grant_store().grants_for_role(role).await?;
        let (mut permissions, _) = self
            .resolver
            .resolve_permissions(grants.into_iter())
            .await?;
        sort_permissions(&mut permissions);
        Ok(permissions)
    }

    /// Replaces the complete grant set of a role.
    ///
    /// Duplicate ids collapse. Returns `None` when the role already held
    /// exactly the requested set.
    pub async fn replace_role_permissions(
        &self,
        actor: &UserIdentity,
        role: Role,
        permission_ids: Vec<PermissionId>,
    ) -> AppResult<Option<PermissionChangeEvent>> {
        self.require_manage(actor).await?;

        let requested: BTreeSet<PermissionId> = permission_ids.into_iter().collect();
        let before = match self
            .resolver
            .role_grant_store()
            .replace_grants(role, requested.clone())
            .await
        {
            Ok(before) => before,
            Err(error) => {
                // The write may have committed before the failure surfaced.
                self.invalidate_role(role);
                return Err(error);
            }
        };

        if before == requested {
            debug!(role = %role, grants = requested.len(), "role grants unchanged");
            return Ok(None);
        }

        self.invalidate_role(role);
        let event = self.event(
            actor,
            PermissionChange::RoleGrantsReplaced {
                role,
                before,
                after: requested,
            },
        );
        info!(
            actor = %actor.subject(),
            role = %role,
            added = event.change.added().len(),
            removed = event.change.removed().len(),
            "replaced role grants"
        );
        self.publish(&event).await;

        Ok(Some(event))
    }

    /// Grants (`true`) or revokes (`false`) one permission for a user.
    pub async fn set_user_override(
        &self,
        actor: &UserIdentity,
        user_id: UserId,
        permission_id: PermissionId,
        granted: bool,
    ) -> AppResult<Option<PermissionChangeEvent>> {
        self.require_manage(actor).await?;
        self.write_override(actor, user_id, permission_id, granted)
            .await
    }

    /// Removes one override so role grants decide again.
    ///
    /// Clearing a missing override is a no-op.
    pub async fn clear_user_override(
        &self,
        actor: &UserIdentity,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<Option<PermissionChangeEvent>> {
        self.require_manage(actor).await?;

        let result = self
            .resolver
            .override_store()
            .clear_override(user_id, permission_id)
            .await;
        self.invalidate_user(user_id);

        let Some(before) = result? else {
            debug!(user_id = %user_id, permission_id = %permission_id, "no override to clear");
            return Ok(None);
        };

        let event = self.event(
            actor,
            PermissionChange::UserOverrideCleared {
                user_id,
                permission_id,
                before,
            },
        );
        info!(
            actor = %actor.subject(),
            user_id = %user_id,
            permission_id = %permission_id,
            "cleared user override"
        );
        self.publish(&event).await;

        Ok(Some(event))
    }

    /// Flips the override of one permission: inherit and revoke become grant,
    /// grant becomes revoke.
    ///
    /// The flip is applied by the store against the row it holds, so
    /// concurrent toggles each flip once.
    pub async fn toggle_user_override(
        &self,
        actor: &UserIdentity,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> AppResult<ToggleOutcome> {
        self.require_manage(actor).await?;

        let result = self
            .resolver
            .override_store()
            .toggle_override(ToggleOverrideInput {
                user_id,
                permission_id,
                tenant_id: actor.tenant_id(),
                created_by: Some(actor.subject().to_owned()),
            })
            .await;
        self.invalidate_user(user_id);

        let before = result?;
        let granted = OverrideState::toggled_value(before);
        let event = self
            .record_override_set(actor, user_id, permission_id, before, granted)
            .await;

        Ok(ToggleOutcome {
            state: OverrideState::from_granted(Some(granted)),
            event: Some(event),
        })
    }

    /// Lists the overrides of a user with their catalog permissions.
    pub async fn user_overrides(
        &self,
        actor: &UserIdentity,
        user_id: UserId,
    ) -> AppResult<Vec<OverrideEntry>> {
        self.require_manage(actor).await?;

        let records = self
            .resolver
            .override_store()
            .override_records_for_user(user_id)
            .await?;

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let Some(permission) = self
                .resolver
                .catalog()
                .find_permission(record.permission_id)
                .await?
            else {
                warn!(
                    user_id = %user_id,
                    permission_id = %record.permission_id,
                    "skipping override of a permission missing from the catalog"
                );
                continue;
            };

            entries.push(OverrideEntry {
                permission,
                state: OverrideState::from_granted(Some(record.granted)),
                created_by: record.created_by,
                created_at: record.created_at,
            });
        }

        entries.sort_by(|left, right| {
            left.permission
                .resource()
                .cmp(right.permission.resource())
                .then_with(|| left.permission.action().cmp(right.permission.action()))
        });
        Ok(entries)
    }

    /// Computes the effective permissions of any user.
    pub async fn effective_permissions_for(
        &self,
        actor: &UserIdentity,
        user_id: UserId,
    ) -> AppResult<EffectivePermissions> {
        self.require_manage(actor).await?;
        self.resolver.compute_effective(user_id).await
    }

    async fn require_manage(&self, actor: &UserIdentity) -> AppResult<()> {
        let actor_id = UserId::from_uuid(actor.subject_uuid()?);
        self.resolver
            .require_permission(actor_id, MANAGE_PERMISSIONS_ACTION, PERMISSIONS_RESOURCE)
            .await
    }

    async fn write_override(
        &self,
        actor: &UserIdentity,
        user_id: UserId,
        permission_id: PermissionId,
        granted: bool,
    ) -> AppResult<Option<PermissionChangeEvent>> {
        let result = self
            .resolver
            .override_store()
            .set_override(SetOverrideInput {
                user_id,
                permission_id,
                granted,
                tenant_id: actor.tenant_id(),
                created_by: Some(actor.subject().to_owned()),
            })
            .await;
        self.invalidate_user(user_id);

        let before = result?;
        if before == Some(granted) {
            debug!(user_id = %user_id, permission_id = %permission_id, granted, "override unchanged");
            return Ok(None);
        }

        Ok(Some(
            self.record_override_set(actor, user_id, permission_id, before, granted)
                .await,
        ))
    }

    async fn record_override_set(
        &self,
        actor: &UserIdentity,
        user_id: UserId,
        permission_id: PermissionId,
        before: Option<bool>,
        granted: bool,
    ) -> PermissionChangeEvent {
        let event = self.event(
            actor,
            PermissionChange::UserOverrideSet {
                user_id,
                permission_id,
                before,
                after: granted,
            },
        );
        info!(
            actor = %actor.subject(),
            user_id = %user_id,
            permission_id = %permission_id,
            granted,
            "set user override"
        );
        self.publish(&event).await;

        event
    }

    fn invalidate_role(&self, role: Role) {
        if let Some(cache) = self.resolver.cache() {
            cache.invalidate_role(role);
        }
    }

    fn invalidate_user(&self, user_id: UserId) {
        if let Some(cache) = self.resolver.cache() {
            cache.invalidate(user_id);
        }
    }

    fn event(&self, actor: &UserIdentity, change: PermissionChange) -> PermissionChangeEvent {
        PermissionChangeEvent {
            actor: actor.subject().to_owned(),
            tenant_id: actor.tenant_id(),
            change,
            occurred_at: Utc::now(),
        }
    }

    async fn publish(&self, event: &PermissionChangeEvent) {
        if let Err(error) = self.change_sink.publish(event.clone()).await {
            warn!(
                action = event.change.audit_action().as_str(),
                target = %event.change.target(),
                error = %error,
                "failed to publish permission change"
            );
        }
    }
}
