//! Client transport over `tokio-tungstenite`.
//!
//! Each `connect` spawns one pump task that owns both halves of the socket
//! and bridges them to the channel pair in [`ClientConnection`]. The task
//! always ends by emitting exactly one [`ClientFrame::Closed`].

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
};

use crate::domain::realtime::NORMAL_CLOSURE;
use crate::ports::{ClientCommand, ClientConnection, ClientConnector, ClientFrame, TransportError};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens `ws://` or `wss://` connections to the realtime endpoint.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    url: String,
    connect_timeout: Duration,
}

impl TungsteniteConnector {
    /// `url` is the full socket URL, e.g. `ws://pos.local:8080/ws`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ClientConnector for TungsteniteConnector {
    async fn connect(&self) -> Result<ClientConnection, TransportError> {
        let (stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| TransportError::Connect("handshake timed out".to_string()))?
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (mut write, mut read) = stream.split();
        let (outbound, mut commands) = mpsc::unbounded_channel::<ClientCommand>();
        let (frames, inbound) = mpsc::unbounded_channel::<ClientFrame>();

        tokio::spawn(async move {
            let code = loop {
                tokio::select! {
                    command = commands.recv() => match command {
                        Some(ClientCommand::Text(text)) => {
                            if let Err(e) = write.send(Message::Text(text)).await {
                                tracing::debug!(error = %e, "Client write failed");
                                break None;
                            }
                        }
                        Some(ClientCommand::Close { code }) => {
                            let frame = CloseFrame {
                                code: CloseCode::from(code),
                                reason: "".into(),
                            };
                            let _ = write.send(Message::Close(Some(frame))).await;
                            break Some(code);
                        }
                        // Session dropped its handle.
                        None => {
                            let _ = write.close().await;
                            break Some(NORMAL_CLOSURE);
                        }
                    },
                    message = read.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            if frames.send(ClientFrame::Text(text)).is_err() {
                                let _ = write.close().await;
                                break Some(NORMAL_CLOSURE);
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            break frame.map(|f| u16::from(f.code));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::debug!(error = %e, "Client read failed");
                            break None;
                        }
                        None => break None,
                    }
                }
            };
            let _ = frames.send(ClientFrame::Closed { code });
        });

        Ok(ClientConnection { outbound, inbound })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::realtime::GOING_AWAY;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    /// Accepts one socket, echoes the first text frame, then closes with `code`.
    async fn echo_then_close(code: u16) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(format!("echo:{}", text))).await.unwrap();
            }
            let _ = ws
                .send(Message::Close(Some(CloseFrame {
                    code: CloseCode::from(code),
                    reason: "bye".into(),
                })))
                .await;
            while ws.next().await.is_some() {}
        });
        format!("ws://{}/ws", addr)
    }

    #[tokio::test]
    async fn relays_frames_and_reports_close_code() {
        let url = echo_then_close(GOING_AWAY).await;
        let connector = TungsteniteConnector::new(url);

        let mut conn = connector.connect().await.unwrap();
        conn.outbound
            .send(ClientCommand::Text("hello".to_string()))
            .unwrap();

        assert_eq!(
            conn.inbound.recv().await,
            Some(ClientFrame::Text("echo:hello".to_string()))
        );
        assert_eq!(
            conn.inbound.recv().await,
            Some(ClientFrame::Closed {
                code: Some(GOING_AWAY)
            })
        );
    }

    #[tokio::test]
    async fn server_pings_are_answered_while_reading() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.send(Message::Ping(b"beat".to_vec())).await.unwrap();
            let reply = loop {
                match ws.next().await {
                    Some(Ok(Message::Pong(data))) => break Some(data),
                    Some(Ok(_)) => continue,
                    _ => break None,
                }
            };
            ws.send(Message::Text("after-pong".to_string())).await.unwrap();
            while ws.next().await.is_some() {}
            reply
        });

        let connector = TungsteniteConnector::new(format!("ws://{}/ws", addr));
        let mut conn = connector.connect().await.unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(2), conn.inbound.recv())
            .await
            .unwrap();
        assert_eq!(frame, Some(ClientFrame::Text("after-pong".to_string())));

        conn.outbound.send(ClientCommand::Close { code: NORMAL_CLOSURE }).unwrap();
        let reply = tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply, Some(b"beat".to_vec()));
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = TungsteniteConnector::new(format!("ws://{}/ws", addr))
            .with_connect_timeout(Duration::from_secs(2));

        assert!(matches!(
            connector.connect().await,
            Err(TransportError::Connect(_))
        ));
    }
}
