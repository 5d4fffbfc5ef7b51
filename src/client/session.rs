//! Client session manager.
//!
//! One task per session owns the transport and the reconnect loop:
//!
//! ```text
//! Disconnected ─▶ Connecting ─▶ Open ─▶ Authenticated
//!       ▲             │                      │
//!       │         connect failed        close / error
//!       └──── backoff sleep ◀────────────────┘
//! ```
//!
//! On every open the identity message (`AUTH` or `JOIN_TABLE`) is queued
//! before the transport is exposed to [`SessionHandle::send`], so it always
//! precedes application messages. A close with code 1000 ends the loop; any
//! other close schedules a reconnect.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::adapters::websocket::{ClientMessage, ControlMessage, ServerFrame};
use crate::domain::foundation::{StateMachine, TableId, UserId};
use crate::domain::realtime::{
    should_reconnect, EventPayload, EventType, SessionState, StaffRole, NORMAL_CLOSURE,
};
use crate::ports::{ClientCommand, ClientConnection, ClientConnector, ClientFrame};

use super::alerts::AlertFallback;
use super::backoff::{Disconnect, ReconnectPolicy};
use super::dispatcher::{EventDispatcher, Unsubscribe};

/// Errors surfaced to UI code. Display text is safe to show to users.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("Sem conexão com o servidor. Tente novamente em alguns segundos.")]
    NotConnected,

    #[error("Não foi possível enviar. Tente novamente.")]
    Encoding,
}

/// Who this client is, re-sent after every reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    Staff { user_id: UserId, role: StaffRole },
    Table { table_id: TableId },
}

impl Credentials {
    pub fn identity_message(&self) -> ClientMessage {
        match *self {
            Credentials::Staff { user_id, role } => ClientMessage::auth(user_id, role),
            Credentials::Table { table_id } => ClientMessage::join_table(table_id),
        }
    }
}

type Link = Option<mpsc::UnboundedSender<ClientCommand>>;

/// Builds and starts a client session.
pub struct SessionManager {
    connector: Arc<dyn ClientConnector>,
    credentials: Credentials,
    policy: ReconnectPolicy,
    dispatcher: EventDispatcher,
    alerts: Option<Arc<AlertFallback>>,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn ClientConnector>, credentials: Credentials) -> Self {
        Self {
            connector,
            credentials,
            policy: ReconnectPolicy::default(),
            dispatcher: EventDispatcher::new(),
            alerts: None,
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Vibrate and beep for events received in the foreground.
    pub fn with_alerts(mut self, alerts: Arc<AlertFallback>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    /// Subscribe before [`start`](Self::start) to catch the first events.
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Spawn the session task. Must be called inside a Tokio runtime.
    pub fn start(self) -> SessionHandle {
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let (link_tx, link_rx) = watch::channel::<Link>(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let session = SessionLoop {
            connector: self.connector,
            identity: self.credentials.identity_message(),
            policy: self.policy,
            dispatcher: self.dispatcher.clone(),
            alerts: self.alerts,
            state: state_tx,
            link: link_tx,
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(session.run());

        SessionHandle {
            state: state_rx,
            link: link_rx,
            dispatcher: self.dispatcher,
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running session. Dropping it tears the session down.
pub struct SessionHandle {
    state: watch::Receiver<SessionState>,
    link: watch::Receiver<Link>,
    dispatcher: EventDispatcher,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    pub fn subscribe<F>(&self, event_type: EventType, handler: F) -> Unsubscribe
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(event_type, handler)
    }

    /// Queue an application message on the current transport.
    pub fn send(&self, message: &ClientMessage) -> Result<(), ClientError> {
        let Some(outbound) = self.link.borrow().clone() else {
            return Err(ClientError::NotConnected);
        };
        let json = serde_json::to_string(message).map_err(|e| {
            tracing::error!(error = %e, "Client message serialization failed");
            ClientError::Encoding
        })?;
        outbound
            .send(ClientCommand::Text(json))
            .map_err(|_| ClientError::NotConnected)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Close with code 1000, cancel any pending reconnect and wait for the
    /// session task to end.
    pub async fn close(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Session task ended abnormally");
        }
    }
}

enum Served {
    Closed(Option<u16>),
    Cancelled,
}

struct SessionLoop {
    connector: Arc<dyn ClientConnector>,
    identity: ClientMessage,
    policy: ReconnectPolicy,
    dispatcher: EventDispatcher,
    alerts: Option<Arc<AlertFallback>>,
    state: watch::Sender<SessionState>,
    link: watch::Sender<Link>,
    shutdown: watch::Receiver<bool>,
}

impl SessionLoop {
    async fn run(mut self) {
        loop {
            if self.is_cancelled() {
                break;
            }

            self.transition(SessionState::Connecting);
            let connected = tokio::select! {
                result = self.connector.connect() => result,
                _ = cancelled(&mut self.shutdown) => break,
            };

            let cause = match connected {
                Ok(connection) => {
                    self.transition(SessionState::Open);
                    self.policy.reset();
                    match self.serve(connection).await {
                        Served::Cancelled => break,
                        Served::Closed(code) if !should_reconnect(code) => {
                            tracing::info!(code = ?code, "Session closed normally; not reconnecting");
                            break;
                        }
                        Served::Closed(code) => {
                            tracing::info!(code = ?code, "Session transport closed");
                            Disconnect::Closed
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Session connect failed");
                    self.transition(SessionState::Disconnected);
                    Disconnect::ConnectFailed
                }
            };

            let delay = self.policy.next_delay(cause);
            tracing::info!(
                delay_ms = delay.as_millis() as u64,
                attempt = self.policy.attempt(),
                "Reconnecting"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancelled(&mut self.shutdown) => break,
            }
        }

        self.link.send_replace(None);
        self.transition(SessionState::Disconnected);
        tracing::debug!("Session ended");
    }

    async fn serve(&mut self, connection: ClientConnection) -> Served {
        let ClientConnection {
            outbound,
            mut inbound,
        } = connection;

        let identity = match serde_json::to_string(&self.identity) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Identity serialization failed");
                let _ = outbound.send(ClientCommand::Close {
                    code: NORMAL_CLOSURE,
                });
                self.transition(SessionState::Disconnected);
                return Served::Cancelled;
            }
        };
        if outbound.send(ClientCommand::Text(identity)).is_err() {
            self.transition(SessionState::Disconnected);
            return Served::Closed(None);
        }
        self.transition(SessionState::Authenticated);
        self.link.send_replace(Some(outbound.clone()));

        let served = loop {
            tokio::select! {
                frame = inbound.recv() => match frame {
                    Some(ClientFrame::Text(text)) => self.on_text(&text),
                    Some(ClientFrame::Closed { code }) => break Served::Closed(code),
                    None => break Served::Closed(None),
                },
                _ = cancelled(&mut self.shutdown) => {
                    let _ = outbound.send(ClientCommand::Close { code: NORMAL_CLOSURE });
                    break Served::Cancelled;
                }
            }
        };

        self.link.send_replace(None);
        self.transition(SessionState::Disconnected);
        served
    }

    fn on_text(&self, text: &str) {
        match ServerFrame::parse(text) {
            Ok(ServerFrame::Event(payload)) => {
                if let Some(alerts) = &self.alerts {
                    alerts.on_event(payload.event_type());
                }
                let handled = self.dispatcher.dispatch(&payload);
                tracing::trace!(event_type = %payload.event_type(), handled, "Event received");
            }
            Ok(ServerFrame::Control(ControlMessage::Error { code, message })) => {
                tracing::warn!(code = %code, message = %message, "Server rejected a message");
            }
            Ok(ServerFrame::Control(control)) => {
                tracing::debug!(?control, "Control frame received");
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unparseable server frame");
            }
        }
    }

    fn transition(&self, target: SessionState) {
        let current = *self.state.borrow();
        if current == target {
            return;
        }
        match current.transition_to(target) {
            Ok(next) => {
                self.state.send_replace(next);
            }
            Err(e) => tracing::warn!(error = %e, "Unexpected session state change"),
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }
}

/// Resolves once shutdown is requested or the handle is dropped.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
