use async_trait::async_trait;
use maintly_application::{PermissionChangeEvent, PermissionChangeSink};
use maintly_core::{AppError, AppResult};
use tokio::sync::RwLock;
use tracing::info;

/// Records permission changes in memory.
#[derive(Debug, Default)]
pub struct InMemoryPermissionChangeLog {
    events: RwLock<Vec<PermissionChangeEvent>>,
}

impl InMemoryPermissionChangeLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns recorded events, oldest first.
    pub async fn events(&self) -> Vec<PermissionChangeEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl PermissionChangeSink for InMemoryPermissionChangeLog {
    async fn publish(&self, event: PermissionChangeEvent) -> AppResult<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}

/// Writes permission changes to the `tracing` pipeline as structured events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPermissionChangeSink;

#[async_trait]
impl PermissionChangeSink for TracingPermissionChangeSink {
    async fn publish(&self, event: PermissionChangeEvent) -> AppResult<()> {
        let detail = serde_json::to_string(&event.change).map_err(|error| {
            AppError::Internal(format!("failed to serialize permission change: {error}"))
        })?;

        info!(
            target: "maintly::audit",
            action = event.change.audit_action().as_str(),
            actor = %event.actor,
            tenant_id = %event.tenant_id,
            target_entity = %event.change.target(),
            occurred_at = %event.occurred_at.to_rfc3339(),
            detail = %detail,
            "{}",
            event.summary()
        );
        Ok(())
    }
}
