//! Configuration schema. Sections mirror the `[credentials]`, `[chat]` and
//! `[session]` tables of `config.toml`.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "wss://spark-api.xf-yun.com/v1.1/chat";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SparkConfig {
    pub credentials: CredentialsConfig,
    pub chat: ChatConfig,
    pub session: SessionConfig,
}

/// Application credentials issued by the Spark console.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub app_id: String,
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("app_id", &self.app_id)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// Endpoint and generation defaults for each exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub endpoint: String,
    pub domain: String,
    pub temperature: f64,
    pub top_k: u32,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            domain: "general".into(),
            temperature: 0.5,
            top_k: 4,
            max_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Deadline for one exchange in seconds. Unset means no deadline.
    pub timeout_secs: Option<u64>,
}
