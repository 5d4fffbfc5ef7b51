//! UnsubscribePushHandler - Command handler for push opt-out.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::push::Subscriber;
use crate::ports::SubscriptionStore;

/// Command to delete one subscription.
#[derive(Debug, Clone)]
pub struct UnsubscribePushCommand {
    pub subscriber: Subscriber,
    pub endpoint: String,
}

/// Handler for push opt-out.
pub struct UnsubscribePushHandler {
    store: Arc<dyn SubscriptionStore>,
}

impl UnsubscribePushHandler {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    /// Fails with `SubscriptionNotFound` when nothing was stored under the key.
    pub async fn handle(&self, cmd: UnsubscribePushCommand) -> Result<(), DomainError> {
        let subscriber_id = cmd.subscriber.id();
        let removed = self.store.remove(&subscriber_id, &cmd.endpoint).await?;
        if !removed {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "No push subscription for this device",
            ));
        }

        tracing::info!(subscriber = %subscriber_id, endpoint = %cmd.endpoint, "Push subscription removed");
        Ok(())
    }
}
