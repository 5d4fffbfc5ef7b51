//! Push notification payload derived from an event.
//!
//! This is the JSON the installed service worker receives:
//! `{"title", "body", "tag", "data": {"tableId"?, "orderId"?, "url"?}}`.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrderId, TableId};
use crate::domain::realtime::EventPayload;

/// Routing data attached to a notification, used on click.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<TableId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// System notification shown by the service worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    /// Notifications sharing a tag replace each other on the device.
    pub tag: String,
    pub data: NotificationData,
}

impl PushNotification {
    pub fn from_event(payload: &EventPayload) -> Self {
        let data = NotificationData {
            table_id: payload.table_id(),
            order_id: payload.order_id(),
            url: None,
        };

        let (title, body, tag) = match payload {
            EventPayload::NewOrder(new_order) => (
                "Novo Pedido!",
                format!(
                    "Mesa {}: pedido #{} com {} itens",
                    new_order.table.number, new_order.order.id, new_order.order.item_count
                ),
                format!("order-{}", new_order.order.id),
            ),
            EventPayload::OrderUpdated(order) => (
                "Pedido Atualizado",
                format!("Pedido #{}: {}", order.id, order.status.label()),
                format!("order-{}", order.id),
            ),
            EventPayload::TableUpdated(table) => (
                "Mesa Atualizada",
                format!("Mesa {} foi atualizada", table.number),
                format!("table-{}", table.id),
            ),
            EventPayload::WaiterCalled(call) => (
                "Garçom Chamado!",
                format!("Mesa {} está chamando um garçom", call.table_number),
                format!("waiter-call-{}", call.table_number),
            ),
        };

        let mut notification = Self {
            title: title.to_string(),
            body,
            tag,
            data,
        };
        notification.data.url = Some(notification.click_url());
        notification
    }

    /// Page the service worker focuses or opens when the notification is clicked.
    ///
    /// Prefers an explicit url, then the order, then the table.
    pub fn click_url(&self) -> String {
        if let Some(url) = &self.data.url {
            return url.clone();
        }
        match (self.data.order_id, self.data.table_id) {
            (Some(order_id), _) => format!("/orders/{}", order_id),
            (None, Some(table_id)) => format!("/tables/{}", table_id),
            (None, None) => "/".to_string(),
        }
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::realtime::{Event, OrderStatus, OrderSummary};
    use crate::domain::foundation::Timestamp;
    use serde_json::json;

    #[test]
    fn waiter_called_uses_portuguese_title_and_table_link() {
        let event = Event::waiter_called(TableId::new(3).unwrap());
        let notification = PushNotification::from_event(&event.payload);

        assert_eq!(notification.title, "Garçom Chamado!");
        assert_eq!(notification.tag, "waiter-call-3");
        assert_eq!(notification.click_url(), "/tables/3");
    }

    #[test]
    fn order_updated_links_to_order() {
        let event = Event::order_updated(OrderSummary {
            id: OrderId::new(42).unwrap(),
            table_id: TableId::new(3).unwrap(),
            status: OrderStatus::Ready,
            total_cents: 1200,
            item_count: 1,
            updated_at: Timestamp::now(),
        });
        let notification = PushNotification::from_event(&event.payload);

        assert_eq!(notification.body, "Pedido #42: Pronto");
        assert_eq!(notification.click_url(), "/orders/42");
    }

    #[test]
    fn serialized_payload_omits_missing_data_fields() {
        let notification = PushNotification {
            title: "t".to_string(),
            body: "b".to_string(),
            tag: "x".to_string(),
            data: NotificationData::default(),
        };
        let value = serde_json::to_value(&notification).unwrap();

        assert_eq!(value, json!({"title": "t", "body": "b", "tag": "x", "data": {}}));
        assert_eq!(notification.click_url(), "/");
    }
}
