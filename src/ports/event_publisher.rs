//! EventPublisher port - Interface the CRUD layer uses to emit events.
//!
//! Callers publish only after the underlying state change is committed, so a
//! client that re-queries on receipt sees consistent data.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::realtime::Event;

/// Port for publishing realtime events.
///
/// # Example
///
/// ```ignore
/// repository.save(&order).await?;
/// publisher.publish(Event::new_order(order.summary(), table.summary())).await?;
/// ```
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Route a single event to its scope.
    ///
    /// Per-target delivery failures are handled internally and do not
    /// surface here.
    async fn publish(&self, event: Event) -> Result<(), DomainError>;
}
