//! Async driver feeding transport events into a `ChatSession`.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::state::{ChatReply, ChatSession, Transition};
use crate::auth::{endpoint_host, Authorizer};
use crate::protocol::{ChatParameters, Message};
use crate::transport::{Connection, Connector};
use crate::SparkError;

const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Inputs of one exchange.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub endpoint: &'a str,
    pub parameters: &'a ChatParameters,
    pub user_id: &'a str,
    pub messages: &'a [Message],
}

/// Per-exchange limits.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Deadline for the whole exchange, connect included. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Upper bound on the forced close after a failure.
    pub close_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

impl SessionOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }
}

/// Drive one exchange to completion over a connection from `connector`.
///
/// Invalid endpoints fail before any connection is attempted. Cancellation
/// and the deadline are honoured at every transport await and both
/// force-close the transport.
pub async fn run_session(
    connector: &dyn Connector,
    authorizer: &Authorizer,
    request: ChatRequest<'_>,
    options: &SessionOptions,
    cancel: &CancellationToken,
) -> Result<ChatReply, SparkError> {
    let host = endpoint_host(request.endpoint)?;
    let signed = authorizer.sign(host);
    let url = format!("{}?{}", request.endpoint, signed.query_string());

    info!(
        endpoint = %request.endpoint,
        uid = %request.user_id,
        messages = request.messages.len(),
        "Opening chat session"
    );

    let deadline = deadline(options.timeout);
    tokio::pin!(deadline);

    let mut session = ChatSession::new();

    let mut conn = tokio::select! {
        result = connector.connect(&url) => result?,
        _ = cancel.cancelled() => return Err(SparkError::Cancelled),
        elapsed = &mut deadline => return Err(SparkError::Timeout(elapsed)),
    };

    let payload = match session.on_open(
        authorizer.credentials().app_id(),
        request.user_id,
        request.parameters,
        request.messages,
    ) {
        Ok(payload) => payload,
        Err(e) => return finish(conn.as_mut(), Err(e), options).await,
    };

    let sent = tokio::select! {
        result = conn.send(payload) => result.err().map(|e| session.on_error(transport_message(e))),
        _ = cancel.cancelled() => Some(session.abort(SparkError::Cancelled)),
        elapsed = &mut deadline => Some(session.abort(SparkError::Timeout(elapsed))),
    };
    if let Some(Transition::Settled(result)) = sent {
        return finish(conn.as_mut(), result, options).await;
    }
    session.on_sent();
    debug!("Request frame sent");

    loop {
        let transition = tokio::select! {
            event = conn.recv() => session.on_event(event),
            _ = cancel.cancelled() => session.abort(SparkError::Cancelled),
            elapsed = &mut deadline => session.abort(SparkError::Timeout(elapsed)),
        };

        let transition = match transition {
            Transition::RequestClose => {
                debug!("Requesting close");
                tokio::select! {
                    result = conn.close() => match result {
                        Ok(()) => Transition::Await,
                        Err(e) => session.on_error(transport_message(e)),
                    },
                    _ = cancel.cancelled() => session.abort(SparkError::Cancelled),
                    elapsed = &mut deadline => session.abort(SparkError::Timeout(elapsed)),
                }
            }
            other => other,
        };

        if let Transition::Settled(result) = transition {
            return finish(conn.as_mut(), result, options).await;
        }
    }
}

/// Force-close on failure paths other than a broken transport, then hand the
/// result back.
async fn finish(
    conn: &mut dyn Connection,
    result: Result<ChatReply, SparkError>,
    options: &SessionOptions,
) -> Result<ChatReply, SparkError> {
    if let Err(e) = &result {
        if !matches!(e, SparkError::Transport(_)) {
            shutdown(conn, options.close_timeout).await;
        }
    }
    result
}

/// Resolves with the configured duration once it elapses; never without one.
async fn deadline(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(duration) => {
            tokio::time::sleep(duration).await;
            duration
        }
        None => std::future::pending().await,
    }
}

/// Best-effort close, bounded by `limit`.
async fn shutdown(conn: &mut dyn Connection, limit: Duration) {
    match tokio::time::timeout(limit, conn.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "Close after failure did not complete"),
        Err(_) => debug!(?limit, "Close after failure timed out"),
    }
}

fn transport_message(error: SparkError) -> String {
    match error {
        SparkError::Transport(message) => message,
        other => other.to_string(),
    }
}
