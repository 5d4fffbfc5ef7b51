//! Realtime domain - identities, routing scopes, events and the client
//! session lifecycle.

mod event;
mod identity;
mod scope;
mod session_state;

pub use event::{
    Event, EventPayload, EventType, NewOrderData, OrderStatus, OrderSummary, TableStatus,
    TableSummary, WaiterCalledData,
};
pub use identity::{Identity, StaffRole};
pub use scope::{Scope, Topic};
pub use session_state::{should_reconnect, SessionState, GOING_AWAY, NORMAL_CLOSURE};
