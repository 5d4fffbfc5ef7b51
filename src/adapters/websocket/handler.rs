//! WebSocket upgrade handler for the realtime channel.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Register the socket unauthenticated and send `CONNECTED`
//! 2. Spawn the writer task (the connection's FIFO queue, plus pings)
//! 3. Read client messages until close, error, or idle timeout
//! 4. Remove the connection from the registry

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use crate::application::handlers::realtime::{CallWaiterCommand, CallWaiterHandler};
use crate::config::RealtimeConfig;
use crate::domain::foundation::{ConnectionId, ErrorCode, TableId, UserId};
use crate::domain::realtime::StaffRole;
use crate::ports::{ConnectionRegistry, EventPublisher, Transport};

use super::messages::{ClientMessage, ControlMessage};
use super::transport::{ChannelTransport, OutboundFrame};

/// Close code sent when a client stays silent past the idle timeout.
///
/// Application-range code, so clients treat it as abnormal and reconnect.
pub const IDLE_TIMEOUT_CLOSE: u16 = 4000;

/// How long either half waits on the other once the connection is closing.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Server heartbeat timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub ping_interval: Duration,
    pub idle_timeout: Duration,
}

impl Heartbeat {
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: config.ping_interval(),
            idle_timeout: config.idle_timeout(),
        }
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::from_config(&RealtimeConfig::default())
    }
}

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub registry: Arc<dyn ConnectionRegistry>,
    /// Where `CALL_WAITER` publishes.
    pub event_publisher: Arc<dyn EventPublisher>,
    pub heartbeat: Heartbeat,
}

impl WebSocketState {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        event_publisher: Arc<dyn EventPublisher>,
        heartbeat: Heartbeat,
    ) -> Self {
        Self {
            registry,
            event_publisher,
            heartbeat,
        }
    }

    fn call_waiter_handler(&self) -> CallWaiterHandler {
        CallWaiterHandler::new(self.event_publisher.clone())
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws`
///
/// Identity is not part of the upgrade: clients send `AUTH` or `JOIN_TABLE`
/// as their first message.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();

    let (transport, mut outbound) = ChannelTransport::channel();
    let connection_id = state.registry.accept(transport.clone()).await;
    send_control(
        transport.as_ref(),
        &connection_id,
        &ControlMessage::connected(connection_id),
    );

    // Writer: drains the connection's queue in order and keeps the socket alive.
    let ping_interval = state.heartbeat.ping_interval;
    let mut send_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                frame = outbound.recv() => match frame {
                    Some(OutboundFrame::Text(text)) => {
                        if let Err(e) = sender.send(Message::Text(text.to_string())).await {
                            tracing::debug!(connection_id = %connection_id, "Send error, closing connection: {}", e);
                            break;
                        }
                    }
                    Some(OutboundFrame::Close { code, reason }) => {
                        let frame = CloseFrame {
                            code,
                            reason: reason.into(),
                        };
                        let _ = sender.send(Message::Close(Some(frame))).await;
                        break;
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Reader: every inbound frame, pongs included, resets the idle timer.
    let idle_timeout = state.heartbeat.idle_timeout;
    let recv_state = state.clone();
    let recv_transport = transport.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            let next = match tokio::time::timeout(idle_timeout, receiver.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::info!(connection_id = %connection_id, "Idle timeout, closing connection");
                    let _ = recv_transport.close(IDLE_TIMEOUT_CLOSE, "idle timeout");
                    // Read until the client answers the close frame.
                    let _ = tokio::time::timeout(CLOSE_GRACE, async {
                        while let Some(Ok(message)) = receiver.next().await {
                            if matches!(message, Message::Close(_)) {
                                break;
                            }
                        }
                    })
                    .await;
                    break;
                }
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) =
                        handle_client_text(&recv_state, &connection_id, &text).await
                    {
                        send_control(recv_transport.as_ref(), &connection_id, &reply);
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    tracing::warn!(connection_id = %connection_id, "Received unsupported binary message");
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        code = ?frame.map(|f| f.code),
                        "Client sent close frame"
                    );
                    break;
                }
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %connection_id, "Receive error: {}", e);
                    break;
                }
                None => break,
            }
        }
    });

    let reader_finished = tokio::select! {
        _ = &mut send_task => false,
        _ = &mut recv_task => true,
    };

    state.registry.remove(&connection_id).await;

    if reader_finished {
        // With every sender gone the writer flushes what is queued (an idle
        // close frame, say) and exits.
        drop(transport);
        if tokio::time::timeout(CLOSE_GRACE, &mut send_task)
            .await
            .is_err()
        {
            send_task.abort();
        }
    } else if tokio::time::timeout(CLOSE_GRACE, &mut recv_task)
        .await
        .is_err()
    {
        // No close reply from the client.
        recv_task.abort();
    }

    tracing::debug!(connection_id = %connection_id, "Connection closed");
}

/// Apply one text frame from a client. Returns the control reply, if any.
///
/// Unparseable frames are logged and ignored; the connection stays open.
pub async fn handle_client_text(
    state: &WebSocketState,
    connection_id: &ConnectionId,
    text: &str,
) -> Option<ControlMessage> {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(connection_id = %connection_id, error = %e, "Ignoring malformed client message");
            return None;
        }
    };

    match message {
        ClientMessage::Auth { user_id, role } => {
            let (user_id, role) = match (UserId::new(user_id), role.parse::<StaffRole>()) {
                (Ok(user_id), Ok(role)) => (user_id, role),
                (Err(e), _) | (_, Err(e)) => {
                    return Some(ControlMessage::error(ErrorCode::ValidationFailed, e.to_string()))
                }
            };
            Some(
                match state.registry.authenticate(connection_id, user_id, role).await {
                    Ok(()) => ControlMessage::AuthConfirmed { user_id, role },
                    Err(e) => ControlMessage::from_auth_error(&e),
                },
            )
        }
        ClientMessage::JoinTable { table_id } => {
            let table_id = match TableId::new(table_id) {
                Ok(table_id) => table_id,
                Err(e) => {
                    return Some(ControlMessage::error(ErrorCode::ValidationFailed, e.to_string()))
                }
            };
            Some(match state.registry.join_table(connection_id, table_id).await {
                Ok(()) => ControlMessage::TableJoined { table_id },
                Err(e) => ControlMessage::from_auth_error(&e),
            })
        }
        ClientMessage::CallWaiter { table_id } => {
            let table_id = match table_id.map(TableId::new).transpose() {
                Ok(table_id) => table_id,
                Err(e) => {
                    return Some(ControlMessage::error(ErrorCode::ValidationFailed, e.to_string()))
                }
            };
            let caller = state
                .registry
                .identity(connection_id)
                .await
                .unwrap_or_default();
            let cmd = CallWaiterCommand { caller, table_id };
            match state.call_waiter_handler().handle(cmd).await {
                Ok(_) => None,
                Err(e) => Some(ControlMessage::error(e.code, e.message)),
            }
        }
        ClientMessage::Ping => Some(ControlMessage::pong()),
    }
}

fn send_control(transport: &dyn Transport, connection_id: &ConnectionId, msg: &ControlMessage) {
    let json = match msg.to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(connection_id = %connection_id, error = %e, "Control message serialization failed");
            return;
        }
    };
    if let Err(e) = transport.send_text(Arc::from(json)) {
        tracing::debug!(connection_id = %connection_id, error = %e, "Control message not sent");
    }
}

/// Create axum router for the WebSocket endpoint.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .merge(websocket_router())
///     .with_state(ws_state);
/// ```
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws", get(ws_handler))
}
