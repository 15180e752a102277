//! Responses and error-body interpretation.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A successful response. The body is opaque to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Pick the most helpful message out of an error response body.
///
/// Preference order: a string `detail`, the first `msg` of a `detail` list
/// (validation errors), a string `message`, a short plain-text body, the
/// canonical reason phrase.
pub fn extract_error_message(status: u16, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        match value.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(Value::Array(items)) => {
                if let Some(msg) = items
                    .first()
                    .and_then(|item| item.get("msg"))
                    .and_then(Value::as_str)
                {
                    return msg.to_string();
                }
            }
            _ => {}
        }
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    } else if let Ok(text) = std::str::from_utf8(body) {
        let text = text.trim();
        if !text.is_empty() && text.len() <= 200 && !text.starts_with('<') {
            return text.to_string();
        }
    }

    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("request failed with status {}", status))
}
