//! Wire types for the Spark chat protocol.
//!
//! One request frame is sent after the socket opens; the server answers with
//! a sequence of response frames, the last one carrying `status == 2`.

use serde::{Deserialize, Serialize};

/// `header.status` / `choices.status` value marking the final frame.
pub const STATUS_FINAL: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Generation parameters, passed through to the server unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatParameters {
    pub domain: String,
    pub temperature: f64,
    pub top_k: u32,
    pub max_tokens: u32,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct OutboundFrame<'a> {
    pub header: RequestHeader<'a>,
    pub parameter: RequestParameter<'a>,
    pub payload: RequestPayload<'a>,
}

#[derive(Debug, Serialize)]
pub struct RequestHeader<'a> {
    pub app_id: &'a str,
    pub uid: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RequestParameter<'a> {
    pub chat: &'a ChatParameters,
}

#[derive(Debug, Serialize)]
pub struct RequestPayload<'a> {
    pub message: MessageList<'a>,
}

#[derive(Debug, Serialize)]
pub struct MessageList<'a> {
    pub text: &'a [Message],
}

impl<'a> OutboundFrame<'a> {
    pub fn new(
        app_id: &'a str,
        uid: &'a str,
        parameters: &'a ChatParameters,
        messages: &'a [Message],
    ) -> Self {
        Self {
            header: RequestHeader { app_id, uid },
            parameter: RequestParameter { chat: parameters },
            payload: RequestPayload {
                message: MessageList { text: messages },
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    pub header: ResponseHeader,
    /// Error frames may arrive without a payload.
    #[serde(default)]
    pub payload: Option<ResponsePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseHeader {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub status: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponsePayload {
    pub choices: Choices,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choices {
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub seq: u64,
    #[serde(default)]
    pub text: Vec<TextPiece>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextPiece {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub index: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub text: TokenUsage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub question_tokens: u64,
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// The parts of an inbound frame the session acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// 0 on success, provider error code otherwise.
    pub status_code: i64,
    /// 2 on the final fragment.
    pub stream_status: i64,
    pub content: String,
    pub message: String,
    pub sid: Option<String>,
    pub seq: u64,
    pub usage: Option<TokenUsage>,
}

impl Fragment {
    /// Decode one text frame.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<InboundFrame>(raw).map(Self::from)
    }

    pub fn is_final(&self) -> bool {
        self.stream_status == STATUS_FINAL
    }
}

impl From<InboundFrame> for Fragment {
    fn from(frame: InboundFrame) -> Self {
        let (content, seq, usage) = match frame.payload {
            Some(payload) => (
                payload
                    .choices
                    .text
                    .into_iter()
                    .next()
                    .map(|piece| piece.content)
                    .unwrap_or_default(),
                payload.choices.seq,
                payload.usage.map(|u| u.text),
            ),
            None => (String::new(), 0, None),
        };

        Self {
            status_code: frame.header.code,
            stream_status: frame.header.status,
            content,
            message: frame.header.message,
            sid: frame.header.sid,
            seq,
            usage,
        }
    }
}
