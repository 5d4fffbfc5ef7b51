//! SubscribePushHandler - Command handler for push opt-in.

use std::sync::Arc;

use crate::domain::foundation::DomainError;
use crate::domain::push::{PushKeys, PushSubscription, Subscriber};
use crate::ports::SubscriptionStore;

/// Command to store (or replace) a browser push subscription.
#[derive(Debug, Clone)]
pub struct SubscribePushCommand {
    pub subscriber: Subscriber,
    pub endpoint: String,
    pub keys: PushKeys,
}

/// Handler for push opt-in.
///
/// Re-subscribing with the same subscriber and endpoint replaces the
/// previous record, refreshing its keys and `created_at`.
pub struct SubscribePushHandler {
    store: Arc<dyn SubscriptionStore>,
}

impl SubscribePushHandler {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: SubscribePushCommand) -> Result<PushSubscription, DomainError> {
        let subscription = PushSubscription::new(cmd.subscriber, cmd.endpoint, cmd.keys)?;
        self.store.save(subscription.clone()).await?;

        tracing::info!(
            subscriber = %subscription.subscriber_id(),
            endpoint = %subscription.endpoint,
            "Push subscription saved"
        );
        Ok(subscription)
    }
}
