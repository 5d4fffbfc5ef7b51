//! Typed event subscriptions for client UI code.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::domain::realtime::{EventPayload, EventType};

type Handler = Arc<dyn Fn(&EventPayload) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    next_id: u64,
    by_type: HashMap<EventType, Vec<(u64, Handler)>>,
}

/// Fans received events out to the handlers registered for their type.
///
/// Cloning shares the registrations.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    handlers: Arc<Mutex<Handlers>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for one event type.
    pub fn subscribe<F>(&self, event_type: EventType, handler: F) -> Unsubscribe
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        let mut handlers = lock(&self.handlers);
        let id = handlers.next_id;
        handlers.next_id += 1;
        handlers
            .by_type
            .entry(event_type)
            .or_default()
            .push((id, Arc::new(handler)));

        Unsubscribe {
            handlers: Arc::downgrade(&self.handlers),
            event_type,
            id,
        }
    }

    /// Call every handler for the payload's type. Returns how many ran.
    ///
    /// Handlers run outside the lock, so they may subscribe or unsubscribe.
    pub fn dispatch(&self, payload: &EventPayload) -> usize {
        let matching: Vec<Handler> = lock(&self.handlers)
            .by_type
            .get(&payload.event_type())
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        for handler in &matching {
            handler(payload);
        }
        matching.len()
    }

    pub fn handler_count(&self, event_type: EventType) -> usize {
        lock(&self.handlers)
            .by_type
            .get(&event_type)
            .map_or(0, Vec::len)
    }
}

/// Disposer returned by [`EventDispatcher::subscribe`].
///
/// Dropping it removes the handler.
#[must_use = "dropping the disposer removes the handler immediately"]
pub struct Unsubscribe {
    handlers: Weak<Mutex<Handlers>>,
    event_type: EventType,
    id: u64,
}

impl Unsubscribe {
    pub fn unsubscribe(self) {}
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        let Some(handlers) = self.handlers.upgrade() else {
            return;
        };
        let mut handlers = lock(&handlers);
        if let Some(list) = handlers.by_type.get_mut(&self.event_type) {
            list.retain(|(id, _)| *id != self.id);
            if list.is_empty() {
                handlers.by_type.remove(&self.event_type);
            }
        }
    }
}

// A panicking handler never runs under the lock, so a poisoned map is still
// consistent.
fn lock(handlers: &Mutex<Handlers>) -> MutexGuard<'_, Handlers> {
    handlers.lock().unwrap_or_else(PoisonError::into_inner)
}
