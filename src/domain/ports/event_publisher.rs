//! Event publisher port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::events::PracticeEvent;

/// Accepts domain events for asynchronous delivery to listeners.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: PracticeEvent) -> DomainResult<()>;
}

/// Publisher that drops every event. Used when no listeners are wired.
pub struct NullEventPublisher;

#[async_trait]
impl EventPublisher for NullEventPublisher {
    async fn publish(&self, event: PracticeEvent) -> DomainResult<()> {
        tracing::debug!(event_id = %event.id, event_type = event.variant_name(), "dropping event, no publisher configured");
        Ok(())
    }
}
