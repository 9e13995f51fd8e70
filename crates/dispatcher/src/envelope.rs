//! Webhook request and event envelope types

use serde_json::Value;

/// An inbound webhook delivery, exactly as received.
///
/// The body is kept as raw bytes because the signature covers the byte
/// stream; parsing happens only after verification succeeds.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    /// Raw request body bytes
    pub body: Vec<u8>,
    /// `X-GitHub-Event` header value
    pub event: Option<String>,
    /// `X-Hub-Signature-256` header value
    pub signature: Option<String>,
    /// `X-GitHub-Delivery` header value (GitHub's delivery GUID)
    pub delivery: Option<String>,
}

/// Parsed event envelope: event type, optional action, and the payload.
///
/// Derived from a verified [`WebhookRequest`]; never mutated afterwards.
/// Handlers deserialize the typed view they need from `payload`.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub event: String,
    pub action: Option<String>,
    pub payload: Value,
}

impl EventEnvelope {
    /// Parse the envelope from the event type header and the raw body
    pub fn parse(event: &str, body: &[u8]) -> Result<Self, serde_json::Error> {
        let payload: Value = serde_json::from_slice(body)?;
        let action = payload
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Self {
            event: event.to_string(),
            action,
            payload,
        })
    }

    /// App installation id attached to the payload, if any
    pub fn installation_id(&self) -> Option<i64> {
        self.payload
            .get("installation")
            .and_then(|i| i.get("id"))
            .and_then(Value::as_i64)
    }
}
