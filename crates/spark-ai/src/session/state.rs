//! The chat session state machine.
//!
//! `Connecting → Open → Streaming → Terminated`. Each transport event has
//! one handler; every handler mutates the session in place and reports what
//! the driver should do next. Once terminated, the session ignores all
//! further events, so it settles exactly once.

use tracing::{debug, info, warn};

use crate::protocol::{ChatParameters, Fragment, Message, OutboundFrame, TokenUsage};
use crate::transport::TransportEvent;
use crate::SparkError;

/// Text a session resolves to when no content was received.
pub const EMPTY_RESPONSE: &str = "响应为空";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Streaming,
    Terminated,
}

/// Final result of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    /// Last `header.code` seen; nonzero means the server reported an error.
    pub status_code: i64,
    /// Last `header.message` seen.
    pub message: String,
    pub sid: Option<String>,
    pub usage: Option<TokenUsage>,
    /// Number of fragments received.
    pub fragments: usize,
}

impl ChatReply {
    pub fn is_success(&self) -> bool {
        self.status_code == 0
    }
}

/// What the driver does after a handler runs.
#[derive(Debug)]
pub enum Transition {
    /// Keep waiting for transport events.
    Await,
    /// Ask the transport to close, then keep waiting for its acknowledgment.
    RequestClose,
    /// The session has settled.
    Settled(Result<ChatReply, SparkError>),
}

/// One request/response exchange.
#[derive(Debug)]
pub struct ChatSession {
    state: SessionState,
    text: String,
    fragments: usize,
    status_code: i64,
    message: String,
    sid: Option<String>,
    usage: Option<TokenUsage>,
    close_requested: bool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Connecting,
            text: String::new(),
            fragments: 0,
            status_code: 0,
            message: String::new(),
            sid: None,
            usage: None,
            close_requested: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    /// Connection established. Returns the serialized request frame to send.
    pub fn on_open(
        &mut self,
        app_id: &str,
        uid: &str,
        parameters: &ChatParameters,
        messages: &[Message],
    ) -> Result<String, SparkError> {
        if self.state != SessionState::Connecting {
            return Err(SparkError::InvalidState(format!(
                "open signalled in state {:?}",
                self.state
            )));
        }
        self.state = SessionState::Open;

        let frame = OutboundFrame::new(app_id, uid, parameters, messages);
        serde_json::to_string(&frame).map_err(|e| {
            self.state = SessionState::Terminated;
            SparkError::Encode(e.to_string())
        })
    }

    /// The request frame went out.
    pub fn on_sent(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Streaming;
        }
    }

    /// Dispatch one transport event to its handler.
    pub fn on_event(&mut self, event: TransportEvent) -> Transition {
        match event {
            TransportEvent::Message(raw) => self.on_message(&raw),
            TransportEvent::Error(message) => self.on_error(message),
            TransportEvent::Closed => self.on_close(),
        }
    }

    pub fn on_message(&mut self, raw: &str) -> Transition {
        if self.state != SessionState::Streaming {
            warn!(state = ?self.state, "Ignoring data frame outside streaming state");
            return Transition::Await;
        }

        let fragment = match Fragment::decode(raw) {
            Ok(fragment) => fragment,
            Err(e) => {
                self.state = SessionState::Terminated;
                return Transition::Settled(Err(SparkError::MalformedFragment(e.to_string())));
            }
        };

        debug!(
            code = fragment.status_code,
            status = fragment.stream_status,
            seq = fragment.seq,
            len = fragment.content.len(),
            "Fragment received"
        );

        let finished = fragment.status_code != 0 || fragment.is_final();
        self.text.push_str(&fragment.content);
        self.fragments += 1;
        self.status_code = fragment.status_code;
        self.message = fragment.message;
        if fragment.sid.is_some() {
            self.sid = fragment.sid;
        }
        if fragment.usage.is_some() {
            self.usage = fragment.usage;
        }

        if fragment.status_code != 0 {
            warn!(
                code = fragment.status_code,
                message = %self.message,
                "Server reported an error code"
            );
        }

        if finished {
            if self.close_requested {
                return Transition::Await;
            }
            self.close_requested = true;
            return Transition::RequestClose;
        }
        Transition::Await
    }

    /// Transport failure. Takes precedence over any pending close.
    pub fn on_error(&mut self, message: String) -> Transition {
        if self.state == SessionState::Terminated {
            debug!(error = %message, "Ignoring error after session settled");
            return Transition::Await;
        }
        self.state = SessionState::Terminated;
        warn!(error = %message, "Chat transport failed");
        Transition::Settled(Err(SparkError::Transport(message)))
    }

    /// Transport closed. Resolves with whatever text has accumulated.
    pub fn on_close(&mut self) -> Transition {
        if self.state == SessionState::Terminated {
            return Transition::Await;
        }
        self.state = SessionState::Terminated;

        let text = if self.text.is_empty() {
            EMPTY_RESPONSE.to_string()
        } else {
            std::mem::take(&mut self.text)
        };
        info!(
            fragments = self.fragments,
            code = self.status_code,
            "Chat session closed"
        );
        Transition::Settled(Ok(ChatReply {
            text,
            status_code: self.status_code,
            message: std::mem::take(&mut self.message),
            sid: self.sid.take(),
            usage: self.usage.take(),
            fragments: self.fragments,
        }))
    }

    /// Fail the session from outside the transport (cancellation, deadline).
    pub fn abort(&mut self, error: SparkError) -> Transition {
        if self.state == SessionState::Terminated {
            return Transition::Await;
        }
        self.state = SessionState::Terminated;
        Transition::Settled(Err(error))
    }
}
