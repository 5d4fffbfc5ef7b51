//! Client side of the realtime channel.
//!
//! - [`SessionManager`] - Connects, identifies, reconnects with backoff
//! - [`EventDispatcher`] - Typed `subscribe(eventType, handler)` with disposers
//! - [`AlertFallback`] - Vibration and tones without notification permission
//! - [`ReconnectPolicy`] - Capped exponential backoff with jitter

mod alerts;
mod backoff;
mod dispatcher;
mod session;

pub use alerts::{AlertFallback, AlertOutcome, AlertPattern};
pub use backoff::{Disconnect, ReconnectPolicy};
pub use dispatcher::{EventDispatcher, Unsubscribe};
pub use session::{ClientError, Credentials, SessionHandle, SessionManager};
