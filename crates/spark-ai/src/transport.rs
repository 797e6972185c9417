//! Duplex transport seam and its WebSocket implementation.
//!
//! A `Connector` opens a `Connection`; a successful `connect` is the
//! transport's "open" signal. After that the session only reacts to the
//! events `recv` yields.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::SparkError;

/// Something the transport reports after the connection is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One inbound data frame.
    Message(String),
    /// The connection is closed, by either side.
    Closed,
    /// The connection failed.
    Error(String),
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `url`, returning once the handshake completes.
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, SparkError>;
}

#[async_trait]
pub trait Connection: Send {
    async fn send(&mut self, text: String) -> Result<(), SparkError>;

    /// Wait for the next event. Yields `Closed` forever once the stream ends.
    async fn recv(&mut self) -> TransportEvent;

    /// Request a close. The acknowledgment arrives later through `recv`.
    async fn close(&mut self) -> Result<(), SparkError>;
}

// ---------------------------------------------------------------------------
// tokio-tungstenite
// ---------------------------------------------------------------------------

/// Production connector over `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, SparkError> {
        let (ws, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| SparkError::Transport(e.to_string()))?;
        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WsConnection { ws }))
    }
}

struct WsConnection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, text: String) -> Result<(), SparkError> {
        self.ws
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| SparkError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            match self.ws.next().await {
                None => return TransportEvent::Closed,
                Some(Ok(msg)) => {
                    if let Some(event) = frame_event(msg) {
                        return event;
                    }
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    return TransportEvent::Closed;
                }
                Some(Err(e)) => return TransportEvent::Error(e.to_string()),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SparkError> {
        match self.ws.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(SparkError::Transport(e.to_string())),
        }
    }
}

/// Map one inbound frame to an event. Control frames yield `None`.
fn frame_event(msg: WsMessage) -> Option<TransportEvent> {
    match msg {
        WsMessage::Text(text) => Some(TransportEvent::Message(text.as_str().to_owned())),
        WsMessage::Binary(data) => Some(match String::from_utf8(data.to_vec()) {
            Ok(text) => TransportEvent::Message(text),
            Err(e) => TransportEvent::Error(format!("binary frame is not valid UTF-8: {e}")),
        }),
        WsMessage::Close(frame) => {
            debug!(?frame, "Close frame received");
            Some(TransportEvent::Closed)
        }
        // Ping/Pong are answered by tungstenite itself.
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_utf8_binary_frames_are_messages() {
        assert_eq!(
            frame_event(WsMessage::Text("{\"a\":1}".into())),
            Some(TransportEvent::Message("{\"a\":1}".into()))
        );
        assert_eq!(
            frame_event(WsMessage::Binary("你好".as_bytes().to_vec().into())),
            Some(TransportEvent::Message("你好".into()))
        );
    }

    #[test]
    fn invalid_utf8_binary_frame_is_an_error() {
        let event = frame_event(WsMessage::Binary(vec![b'{', 0xff, 0xfe].into()));
        assert!(matches!(event, Some(TransportEvent::Error(ref m)) if m.contains("UTF-8")));
    }

    #[test]
    fn close_and_control_frames() {
        assert_eq!(frame_event(WsMessage::Close(None)), Some(TransportEvent::Closed));
        assert_eq!(frame_event(WsMessage::Ping(Vec::new().into())), None);
        assert_eq!(frame_event(WsMessage::Pong(Vec::new().into())), None);
    }
}
