//! CallWaiterHandler - Command handler for a customer's "call a waiter" tap.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, TableId};
use crate::domain::realtime::{Event, Identity};
use crate::ports::EventPublisher;

/// Command to summon a waiter to a table.
#[derive(Debug, Clone)]
pub struct CallWaiterCommand {
    /// Identity of the connection that sent `CALL_WAITER`.
    pub caller: Identity,
    /// Table named in the message, if any.
    pub table_id: Option<TableId>,
}

/// Result of a successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallWaiterResult {
    pub table_id: TableId,
}

/// Handler for waiter calls.
///
/// Publishes `WAITER_CALLED` to every staff role. The table comes from the
/// message, falling back to the caller's own table.
pub struct CallWaiterHandler {
    event_publisher: Arc<dyn EventPublisher>,
}

impl CallWaiterHandler {
    pub fn new(event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self { event_publisher }
    }

    pub async fn handle(&self, cmd: CallWaiterCommand) -> Result<CallWaiterResult, DomainError> {
        if !cmd.caller.is_authenticated() {
            return Err(DomainError::new(
                ErrorCode::NotAuthenticated,
                "Send AUTH or JOIN_TABLE before calling a waiter",
            ));
        }

        let table_id = cmd
            .table_id
            .or_else(|| cmd.caller.table_id())
            .ok_or_else(|| DomainError::validation("tableId", "No table to call a waiter to"))?;

        self.event_publisher
            .publish(Event::waiter_called(table_id))
            .await?;

        tracing::info!(table_id = %table_id, caller = cmd.caller.kind(), "Waiter called");
        Ok(CallWaiterResult { table_id })
    }
}
