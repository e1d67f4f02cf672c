//! Message channel abstraction over the upgraded websocket.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};

use super::error::ConnectionError;

/// A bidirectional text channel to one controller.
///
/// `recv` yields the next message as text. Control frames are handled by
/// the implementation and never surface here. A close frame or end of
/// stream is reported as [`ConnectionError::PeerClosed`].
#[async_trait]
pub trait MessageChannel: Send {
    /// Wait for the next message.
    async fn recv(&mut self) -> Result<String, ConnectionError>;

    /// Send one text frame.
    async fn send_text(&mut self, payload: String) -> Result<(), ConnectionError>;

    /// Close the channel. Errors are ignored; the peer may already be gone.
    async fn close(&mut self);

    /// Remote identity used in logs.
    fn peer(&self) -> &str;
}

/// [`MessageChannel`] over an axum websocket.
pub struct WsChannel {
    socket: WebSocket,
    peer: String,
    closed: bool,
}

impl WsChannel {
    pub fn new(socket: WebSocket, peer: impl Into<String>) -> Self {
        Self {
            socket,
            peer: peer.into(),
            closed: false,
        }
    }
}

#[async_trait]
impl MessageChannel for WsChannel {
    async fn recv(&mut self) -> Result<String, ConnectionError> {
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(data))) => {
                    return Ok(String::from_utf8_lossy(&data).into_owned());
                }
                // Pongs are answered by the websocket layer.
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    if let Some(frame) = frame {
                        tracing::debug!(code = %frame.code, reason = %frame.reason, "Close frame received");
                    }
                    self.closed = true;
                    return Err(ConnectionError::PeerClosed);
                }
                Some(Err(e)) => return Err(ConnectionError::from_transport(e)),
                None => {
                    self.closed = true;
                    return Err(ConnectionError::PeerClosed);
                }
            }
        }
    }

    async fn send_text(&mut self, payload: String) -> Result<(), ConnectionError> {
        self.socket
            .send(Message::Text(payload))
            .await
            .map_err(ConnectionError::from_transport)
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let send = self.socket.send(Message::Close(None));
        match tokio::time::timeout(CLOSE_TIMEOUT, send).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "Close frame not delivered"),
            Err(_) => tracing::debug!("Close frame timed out"),
        }
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);
