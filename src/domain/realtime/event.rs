//! Domain events pushed to realtime clients.
//!
//! An event is one closed variant per wire `type`, each with its own payload,
//! plus the scope that decides who receives it. On the wire the payload is
//! the envelope `{"type": "...", "data": {...}}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::foundation::{OrderId, TableId, Timestamp};

use super::Scope;

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Delivered,
    Paid,
    Cancelled,
}

impl OrderStatus {
    /// Label shown to staff and customers.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pendente",
            OrderStatus::Preparing => "Em preparo",
            OrderStatus::Ready => "Pronto",
            OrderStatus::Delivered => "Entregue",
            OrderStatus::Paid => "Pago",
            OrderStatus::Cancelled => "Cancelado",
        }
    }
}

/// Occupancy status of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Available,
    Occupied,
    Reserved,
    Cleaning,
}

/// Order fields carried by order events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: OrderId,
    pub table_id: TableId,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub item_count: u32,
    pub updated_at: Timestamp,
}

/// Table fields carried by table events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub id: TableId,
    pub number: i32,
    pub status: TableStatus,
}

/// `NEW_ORDER` data: the order plus the table it was placed at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderData {
    #[serde(flatten)]
    pub order: OrderSummary,
    pub table: TableSummary,
}

/// `WAITER_CALLED` data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaiterCalledData {
    pub table_number: TableId,
}

/// Typed payload of an event, serialized as `{type, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    NewOrder(NewOrderData),
    OrderUpdated(OrderSummary),
    TableUpdated(TableSummary),
    WaiterCalled(WaiterCalledData),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::NewOrder(_) => EventType::NewOrder,
            EventPayload::OrderUpdated(_) => EventType::OrderUpdated,
            EventPayload::TableUpdated(_) => EventType::TableUpdated,
            EventPayload::WaiterCalled(_) => EventType::WaiterCalled,
        }
    }

    /// Table the event concerns, if any.
    pub fn table_id(&self) -> Option<TableId> {
        match self {
            EventPayload::NewOrder(data) => Some(data.table.id),
            EventPayload::OrderUpdated(order) => Some(order.table_id),
            EventPayload::TableUpdated(table) => Some(table.id),
            EventPayload::WaiterCalled(data) => Some(data.table_number),
        }
    }

    /// Order the event concerns, if any.
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            EventPayload::NewOrder(data) => Some(data.order.id),
            EventPayload::OrderUpdated(order) => Some(order.id),
            EventPayload::TableUpdated(_) | EventPayload::WaiterCalled(_) => None,
        }
    }
}

/// Discriminant of [`EventPayload`], used for typed subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    NewOrder,
    OrderUpdated,
    TableUpdated,
    WaiterCalled,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::NewOrder => "NEW_ORDER",
            EventType::OrderUpdated => "ORDER_UPDATED",
            EventType::TableUpdated => "TABLE_UPDATED",
            EventType::WaiterCalled => "WAITER_CALLED",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One domain occurrence, routed once and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub payload: EventPayload,
    pub scope: Scope,
    pub occurred_at: Timestamp,
}

impl Event {
    pub fn new(payload: EventPayload, scope: Scope) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            scope,
            occurred_at: Timestamp::now(),
        }
    }

    /// A new order, announced to all staff.
    pub fn new_order(order: OrderSummary, table: TableSummary) -> Self {
        Self::new(EventPayload::NewOrder(NewOrderData { order, table }), Scope::all_staff())
    }

    /// An order status change, announced to all staff.
    ///
    /// Use [`Event::with_scope`] to address the customers at the order's table.
    pub fn order_updated(order: OrderSummary) -> Self {
        Self::new(EventPayload::OrderUpdated(order), Scope::all_staff())
    }

    /// A table status change, announced to all staff.
    pub fn table_updated(table: TableSummary) -> Self {
        Self::new(EventPayload::TableUpdated(table), Scope::all_staff())
    }

    /// A customer at `table_id` called for a waiter.
    pub fn waiter_called(table_id: TableId) -> Self {
        Self::new(
            EventPayload::WaiterCalled(WaiterCalledData {
                table_number: table_id,
            }),
            Scope::all_staff(),
        )
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order() -> OrderSummary {
        OrderSummary {
            id: OrderId::new(42).unwrap(),
            table_id: TableId::new(3).unwrap(),
            status: OrderStatus::Preparing,
            total_cents: 4590,
            item_count: 3,
            updated_at: Timestamp::now(),
        }
    }

    fn table() -> TableSummary {
        TableSummary {
            id: TableId::new(3).unwrap(),
            number: 3,
            status: TableStatus::Occupied,
        }
    }

    #[test]
    fn waiter_called_serializes_to_wire_envelope() {
        let event = Event::waiter_called(TableId::new(3).unwrap());
        let value = serde_json::to_value(&event.payload).unwrap();

        assert_eq!(value, json!({"type": "WAITER_CALLED", "data": {"tableNumber": 3}}));
    }

    #[test]
    fn new_order_flattens_order_and_nests_table() {
        let event = Event::new_order(order(), table());
        let value = serde_json::to_value(&event.payload).unwrap();

        assert_eq!(value["type"], "NEW_ORDER");
        assert_eq!(value["data"]["id"], 42);
        assert_eq!(value["data"]["tableId"], 3);
        assert_eq!(value["data"]["status"], "preparing");
        assert_eq!(value["data"]["table"]["number"], 3);
    }

    #[test]
    fn payload_deserializes_from_envelope() {
        let raw = r#"{"type":"TABLE_UPDATED","data":{"id":4,"number":4,"status":"cleaning"}}"#;
        let payload: EventPayload = serde_json::from_str(raw).unwrap();

        assert_eq!(payload.event_type(), EventType::TableUpdated);
        assert_eq!(payload.table_id(), Some(TableId::new(4).unwrap()));
        assert_eq!(payload.order_id(), None);
    }

    #[test]
    fn default_scopes_address_staff() {
        assert_eq!(Event::new_order(order(), table()).scope, Scope::all_staff());
        assert_eq!(Event::waiter_called(TableId::new(1).unwrap()).scope, Scope::all_staff());
    }

    #[test]
    fn with_scope_replaces_scope() {
        let event = Event::order_updated(order()).with_scope(Scope::table(TableId::new(3).unwrap()));
        assert_eq!(event.scope, Scope::table(TableId::new(3).unwrap()));
        assert_eq!(event.event_type(), EventType::OrderUpdated);
    }
}
