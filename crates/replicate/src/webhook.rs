//! Completion callbacks: signature verification and payload decoding.
//!
//! Callbacks are signed per the Standard Webhooks scheme. The signed content
//! is `{webhook-id}.{webhook-timestamp}.{raw body}`, keyed with the base64
//! secret after its `whsec_` prefix, and the `webhook-signature` header holds
//! one or more space-separated `v1,<base64 hmac>` entries.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use mu2mi_core::error::CoreError;
use mu2mi_core::job::OutputShape;
use mu2mi_core::types::{DbId, UserId};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const WEBHOOK_ID_HEADER: &str = "webhook-id";
pub const WEBHOOK_TIMESTAMP_HEADER: &str = "webhook-timestamp";
pub const WEBHOOK_SIGNATURE_HEADER: &str = "webhook-signature";

/// Maximum clock skew accepted between the signed timestamp and now.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 5 * 60;

const SECRET_PREFIX: &str = "whsec_";

// ---------------------------------------------------------------------------
// Signature verification
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing webhook header: {0}")]
    MissingHeader(&'static str),

    #[error("Malformed webhook timestamp")]
    InvalidTimestamp,

    #[error("Webhook timestamp outside tolerance")]
    Expired,

    #[error("No matching webhook signature")]
    Mismatch,

    #[error("Invalid webhook secret: {0}")]
    InvalidSecret(String),
}

/// The three signature headers of one callback.
#[derive(Debug, Clone, Copy)]
pub struct SignedHeaders<'a> {
    pub id: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub signature: Option<&'a str>,
}

#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    /// Build a verifier from a `whsec_<base64>` secret.
    pub fn new(secret: &str) -> Result<Self, SignatureError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = BASE64
            .decode(encoded)
            .map_err(|e| SignatureError::InvalidSecret(e.to_string()))?;
        if key.is_empty() {
            return Err(SignatureError::InvalidSecret("empty key".into()));
        }
        Ok(Self { key })
    }

    /// Verify a callback against the current time (unix seconds).
    pub fn verify(
        &self,
        headers: SignedHeaders<'_>,
        body: &[u8],
        now_unix: i64,
    ) -> Result<(), SignatureError> {
        let id = headers
            .id
            .ok_or(SignatureError::MissingHeader(WEBHOOK_ID_HEADER))?;
        let timestamp = headers
            .timestamp
            .ok_or(SignatureError::MissingHeader(WEBHOOK_TIMESTAMP_HEADER))?;
        let signatures = headers
            .signature
            .ok_or(SignatureError::MissingHeader(WEBHOOK_SIGNATURE_HEADER))?;

        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;
        let skew = now_unix
            .checked_sub(sent_at)
            .map(i64::unsigned_abs)
            .ok_or(SignatureError::InvalidTimestamp)?;
        if skew > TIMESTAMP_TOLERANCE_SECS.unsigned_abs() {
            return Err(SignatureError::Expired);
        }

        let mac = self.mac(id, timestamp.trim(), body)?;

        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .filter_map(|(_, sig)| BASE64.decode(sig).ok())
            .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());

        if matched {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    /// Produce a `v1,<base64>` signature. Used to sign test callbacks.
    pub fn sign(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
        let digest = self.mac(id, timestamp, body)?.finalize().into_bytes();
        Ok(format!("v1,{}", BASE64.encode(digest)))
    }

    fn mac(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| SignatureError::InvalidSecret(e.to_string()))?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }
}

// ---------------------------------------------------------------------------
// Callback metadata
// ---------------------------------------------------------------------------

/// Query string of a callback URL, as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCallbackQuery {
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Validated job identity carried by a callback URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackMetadata {
    pub job_id: DbId,
    pub user_id: UserId,
}

impl CallbackMetadata {
    pub fn parse(raw: &RawCallbackQuery) -> Result<Self, CoreError> {
        let job_id = raw
            .job_id
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| CoreError::invalid_field("jobId", "is required"))?
            .parse::<DbId>()
            .map_err(|_| CoreError::invalid_field("jobId", "must be an integer"))?;

        let user_id = raw
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| CoreError::invalid_field("userId", "must be a non-empty string"))?;

        Ok(Self {
            job_id,
            user_id: user_id.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Callback body
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

/// The fields of a prediction callback this service acts on.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub id: Option<String>,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl WebhookPayload {
    /// A top-level error counts only if it carries something.
    pub fn has_error(&self) -> bool {
        match &self.error {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

/// Provider output decoded according to the job kind's declared shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutput {
    SingleUrl(String),
    UrlList(Vec<Option<String>>),
    Stems(BTreeMap<String, Option<String>>),
    Document(serde_json::Value),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("output does not match the {expected} shape")]
pub struct OutputMismatch {
    pub expected: &'static str,
}

impl ProviderOutput {
    pub fn decode(shape: OutputShape, value: serde_json::Value) -> Result<Self, OutputMismatch> {
        use serde_json::Value;

        match shape {
            OutputShape::SingleUrl(_) => match value {
                Value::String(url) => Ok(Self::SingleUrl(url)),
                _ => Err(OutputMismatch { expected: "single URL" }),
            },
            OutputShape::UrlList => {
                serde_json::from_value::<Vec<Option<String>>>(value)
                    .map(Self::UrlList)
                    .map_err(|_| OutputMismatch { expected: "URL list" })
            }
            OutputShape::Stems => {
                serde_json::from_value::<BTreeMap<String, Option<String>>>(value)
                    .map(Self::Stems)
                    .map_err(|_| OutputMismatch { expected: "stem map" })
            }
            OutputShape::Document(_) => match value {
                Value::Null => Err(OutputMismatch { expected: "document" }),
                other => Ok(Self::Document(other)),
            },
        }
    }
}
