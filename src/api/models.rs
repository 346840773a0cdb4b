//! wg-easy API payloads

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Fallback error text when a failure carries nothing readable
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Release payload. Older servers return a bare version number, newer ones
/// an object, so it stays untyped.
pub type Release = serde_json::Value;

/// Payload returned by a successful create
pub type Created = serde_json::Value;

/// Session status reported by `GET /api/session`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub requires_password: bool,
    #[serde(default)]
    pub authenticated: bool,
}

/// A WireGuard peer managed by wg-easy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub address: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub persistent_keepalive: Option<String>,
    #[serde(default)]
    pub latest_handshake_at: Option<String>,
    #[serde(default)]
    pub transfer_rx: u64,
    #[serde(default)]
    pub transfer_tx: u64,
}

/// Normalized per-call failure, serialized as `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{error}")]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_ERROR)
    }

    /// Build an error from a non-2xx response body.
    ///
    /// wg-easy reports failures as `{"error": ...}`; newer releases use the
    /// h3 shape with `message`/`statusMessage`. Anything else is unknown.
    pub fn from_body(body: &str) -> Self {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ErrorBody {
            error: Option<String>,
            message: Option<String>,
            status_message: Option<String>,
        }

        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error.or(b.message).or(b.status_message))
            .filter(|e| !e.is_empty())
            .map(Self::new)
            .unwrap_or_else(Self::unknown)
    }
}

/// Acknowledgement returned by writes that have no payload of their own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Keepalive {
        Text(String),
        Number(u64),
    }

    Ok(
        Option::<Keepalive>::deserialize(deserializer)?.map(|value| match value {
            Keepalive::Text(s) => s,
            Keepalive::Number(n) => n.to_string(),
        }),
    )
}
