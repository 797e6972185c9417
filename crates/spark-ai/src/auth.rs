//! Handshake signing for the Spark WebSocket endpoint.
//!
//! The server authorizes a connection from three query parameters:
//! `authorization`, `date` and `host`. The authorization token is a
//! base64-wrapped header line carrying an HMAC-SHA256 signature over the
//! host, the date and the fixed request line.

use std::fmt;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::SparkError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "hmac-sha256";
const SIGNED_HEADERS: &str = "host date request-line";
const REQUEST_LINE: &str = "GET /v1.1/chat HTTP/1.1";
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Long-lived application credentials.
#[derive(Clone)]
pub struct Credentials {
    app_id: String,
    api_key: String,
    api_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials, rejecting any empty field.
    pub fn new(
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Result<Self, SparkError> {
        let creds = Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        };
        if creds.app_id.trim().is_empty() {
            return Err(SparkError::MissingCredential("app_id"));
        }
        if creds.api_key.trim().is_empty() {
            return Err(SparkError::MissingCredential("api_key"));
        }
        if creds.api_secret.trim().is_empty() {
            return Err(SparkError::MissingCredential("api_secret"));
        }
        Ok(creds)
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

/// Output of one signing pass. Valid for a single connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub host: String,
    /// HTTP-date the signature was computed over.
    pub date: String,
    /// Base64 HMAC-SHA256 digest of the canonical signing string.
    pub signature: String,
    /// Base64 of the full `api_key=..., signature=...` header line.
    pub authorization: String,
}

impl SignedRequest {
    /// Query string to append to the endpoint after `?`.
    ///
    /// Values are percent-encoded: the date contains spaces and commas, and
    /// the base64 token may contain `+`, `/` and `=`.
    pub fn query_string(&self) -> String {
        format!(
            "authorization={}&date={}&host={}",
            urlencoding::encode(&self.authorization),
            urlencoding::encode(&self.date),
            urlencoding::encode(&self.host),
        )
    }
}

/// Signs connection requests with a fixed set of credentials.
#[derive(Debug, Clone)]
pub struct Authorizer {
    credentials: Credentials,
}

impl Authorizer {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sign a handshake for `host` using the current time.
    pub fn sign(&self, host: &str) -> SignedRequest {
        self.sign_at(host, Utc::now())
    }

    /// Sign a handshake for `host` as of `instant`.
    ///
    /// Pure in `(host, instant, credentials)`; the date has one-second
    /// granularity, so two calls within the same second agree.
    pub fn sign_at(&self, host: &str, instant: DateTime<Utc>) -> SignedRequest {
        let date = http_date(instant);
        let origin = signing_string(host, &date);

        let mut mac = HmacSha256::new_from_slice(self.credentials.api_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(origin.as_bytes());
        let signature = B64.encode(mac.finalize().into_bytes());

        let authorization_origin = format!(
            "api_key=\"{}\", algorithm=\"{ALGORITHM}\", headers=\"{SIGNED_HEADERS}\", signature=\"{signature}\"",
            self.credentials.api_key,
        );
        let authorization = B64.encode(authorization_origin.as_bytes());

        SignedRequest {
            host: host.to_string(),
            date,
            signature,
            authorization,
        }
    }
}

/// Format `instant` as an RFC 1123 HTTP-date.
pub fn http_date(instant: DateTime<Utc>) -> String {
    instant.format(HTTP_DATE_FORMAT).to_string()
}

/// Canonical three-line string the signature is computed over.
pub(crate) fn signing_string(host: &str, date: &str) -> String {
    format!("host: {host}\ndate: {date}\n{REQUEST_LINE}")
}

/// Extract the bare host from a `ws://` or `wss://` endpoint.
pub fn endpoint_host(endpoint: &str) -> Result<&str, SparkError> {
    let rest = endpoint
        .strip_prefix("wss://")
        .or_else(|| endpoint.strip_prefix("ws://"))
        .ok_or_else(|| SparkError::InvalidEndpoint(endpoint.to_string()))?;

    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    if host.is_empty() {
        return Err(SparkError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(host)
}
