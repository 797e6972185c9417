//! Streaming chat client for the Spark conversational endpoint.
//!
//! Provides:
//! - HMAC-SHA256 request signing for the WebSocket handshake
//! - A single-exchange chat session driven as an explicit state machine
//! - A pluggable duplex transport (tokio-tungstenite by default)
//! - Optional cancellation and deadline for each exchange

pub mod auth;
pub mod client;
pub mod protocol;
pub mod session;
pub mod transport;

use std::time::Duration;

pub use auth::{Authorizer, Credentials, SignedRequest};
pub use client::SparkClient;
pub use protocol::{ChatParameters, Fragment, Message, Role, TokenUsage};
pub use session::{ChatReply, ChatSession, SessionOptions, EMPTY_RESPONSE};
pub use transport::{Connection, Connector, TransportEvent, TungsteniteConnector};

#[derive(Debug, thiserror::Error)]
pub enum SparkError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed fragment: {0}")]
    MalformedFragment(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("invalid session state: {0}")]
    InvalidState(String),
    #[error("chat session cancelled")]
    Cancelled,
    #[error("chat session timed out after {0:?}")]
    Timeout(Duration),
}
