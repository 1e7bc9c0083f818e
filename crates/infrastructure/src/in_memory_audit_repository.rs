//! In-memory audit repository for development. Keeps events and logs them to tracing output.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rowguard_application::{AuditEvent, AuditRepository};
use rowguard_core::AppResult;
use tokio::sync::RwLock;
use tracing::info;

/// Audit event with the time it was appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAuditEvent {
    /// Appended event.
    pub event: AuditEvent,
    /// Append timestamp.
    pub recorded_at: DateTime<Utc>,
}

/// Development audit repository that keeps events in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    events: RwLock<Vec<RecordedAuditEvent>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty audit repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every appended event, oldest first.
    pub async fn events(&self) -> Vec<RecordedAuditEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        info!(
            action = event.action.as_str(),
            resource_type = %event.resource_type,
            resource_id = %event.resource_id,
            actor = ?event.actor.map(|actor| actor.as_i64()),
            "audit event recorded"
        );

        self.events.write().await.push(RecordedAuditEvent {
            event,
            recorded_at: Utc::now(),
        });

        Ok(())
    }
}
