//! Public entry point: one `chat` call per exchange.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::{Authorizer, Credentials};
use crate::protocol::{ChatParameters, Message};
use crate::session::{run_session, ChatReply, ChatRequest, SessionOptions};
use crate::transport::{Connector, TungsteniteConnector};
use crate::SparkError;

/// Spark chat client.
///
/// Cheap to share: the credentials are immutable and every call opens its
/// own connection.
#[derive(Clone)]
pub struct SparkClient {
    authorizer: Authorizer,
    connector: Arc<dyn Connector>,
    options: SessionOptions,
}

impl std::fmt::Debug for SparkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparkClient")
            .field("authorizer", &self.authorizer)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SparkClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_connector(credentials, Arc::new(TungsteniteConnector))
    }

    pub fn with_connector(credentials: Credentials, connector: Arc<dyn Connector>) -> Self {
        Self {
            authorizer: Authorizer::new(credentials),
            connector,
            options: SessionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    /// Run one exchange and return the assembled text.
    ///
    /// Server-side error codes do not fail the call; use `chat_reply` to
    /// inspect the last status code.
    pub async fn chat(
        &self,
        endpoint: &str,
        parameters: &ChatParameters,
        user_id: &str,
        messages: &[Message],
    ) -> Result<String, SparkError> {
        self.chat_reply(endpoint, parameters, user_id, messages)
            .await
            .map(|reply| reply.text)
    }

    /// Run one exchange and return the full reply.
    pub async fn chat_reply(
        &self,
        endpoint: &str,
        parameters: &ChatParameters,
        user_id: &str,
        messages: &[Message],
    ) -> Result<ChatReply, SparkError> {
        self.chat_with_cancel(endpoint, parameters, user_id, messages, &CancellationToken::new())
            .await
    }

    /// Run one exchange that fails with `Cancelled` once `cancel` fires.
    pub async fn chat_with_cancel(
        &self,
        endpoint: &str,
        parameters: &ChatParameters,
        user_id: &str,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> Result<ChatReply, SparkError> {
        run_session(
            self.connector.as_ref(),
            &self.authorizer,
            ChatRequest {
                endpoint,
                parameters,
                user_id,
                messages,
            },
            &self.options,
            cancel,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::transport::{Connection, TransportEvent};

    /// Answers every request with a fixed text and counts connections.
    #[derive(Default)]
    struct EchoConnector {
        connections: AtomicUsize,
    }

    struct EchoConnection {
        reply: Option<String>,
        closing: bool,
    }

    #[async_trait]
    impl Connector for EchoConnector {
        async fn connect(&self, _url: &str) -> Result<Box<dyn Connection>, SparkError> {
            self.connections.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(EchoConnection {
                reply: None,
                closing: false,
            }))
        }
    }

    #[async_trait]
    impl Connection for EchoConnection {
        async fn send(&mut self, text: String) -> Result<(), SparkError> {
            let request: serde_json::Value = serde_json::from_str(&text).unwrap();
            let last = request["payload"]["message"]["text"]
                .as_array()
                .and_then(|msgs| msgs.last())
                .and_then(|m| m["content"].as_str())
                .unwrap_or_default()
                .to_string();
            self.reply = Some(
                serde_json::json!({
                    "header": { "code": 0, "status": 2 },
                    "payload": { "choices": { "status": 2, "text": [{ "content": format!("echo: {last}") }] } }
                })
                .to_string(),
            );
            Ok(())
        }

        async fn recv(&mut self) -> TransportEvent {
            match self.reply.take() {
                Some(reply) => TransportEvent::Message(reply),
                None if self.closing => TransportEvent::Closed,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> Result<(), SparkError> {
            self.closing = true;
            Ok(())
        }
    }

    fn params() -> ChatParameters {
        ChatParameters {
            domain: "general".into(),
            temperature: 0.5,
            top_k: 4,
            max_tokens: 256,
        }
    }

    #[tokio::test]
    async fn chat_returns_text() {
        let connector = Arc::new(EchoConnector::default());
        let client = SparkClient::with_connector(
            Credentials::new("app", "key", "secret").unwrap(),
            connector.clone(),
        );

        let text = client
            .chat(
                "wss://spark-api.xf-yun.com/v1.1/chat",
                &params(),
                "u1",
                &[Message::user("ping")],
            )
            .await
            .unwrap();
        assert_eq!(text, "echo: ping");
        assert_eq!(connector.connections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn each_call_opens_its_own_connection() {
        let connector = Arc::new(EchoConnector::default());
        let client = SparkClient::with_connector(
            Credentials::new("app", "key", "secret").unwrap(),
            connector.clone(),
        );
        let endpoint = "ws://localhost:9000/v1.1/chat";
        let params = params();
        let first = [Message::user("a")];
        let second = [Message::user("b")];

        let (a, b) = tokio::join!(
            client.chat(endpoint, &params, "u1", &first),
            client.chat(endpoint, &params, "u2", &second),
        );
        assert_eq!(a.unwrap(), "echo: a");
        assert_eq!(b.unwrap(), "echo: b");
        assert_eq!(connector.connections.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn debug_hides_secrets() {
        let client = SparkClient::new(Credentials::new("app", "key-xyz", "secret-xyz").unwrap());
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("key-xyz"));
        assert!(!dbg.contains("secret-xyz"));
    }
}
