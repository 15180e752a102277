//! Error types for outbound calls.
//!
//! Every failure the pipeline can surface is an [`ApiError`]. The retry
//! coordinator and the circuit breaker never inspect raw transport errors;
//! they work from [`ApiError::failure_class`].
//!
//! # Classification
//! ```text
//! Timeout / Connect / HTTP 503   → ColdBackend  (warming cadence)
//! HTTP 5xx / Network             → Server       (exponential backoff)
//! HTTP 4xx / InvalidRequest      → Client       (never retried)
//! CircuitOpen / Deadline / Closed → Local       (never retried)
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type for outbound calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// How the pipeline should treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The request itself was rejected (4xx).
    Client,
    /// The server answered with an error or broke off mid-response.
    Server,
    /// No response at all, or 503: the backend is most likely asleep.
    ColdBackend,
    /// Rejected before reaching the transport.
    Local,
}

/// A failed outbound call.
///
/// `Clone` so that coalesced callers can all observe the same failure.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The transport gave up waiting for a response.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// No connection could be made, or it dropped before any response.
    #[error("could not reach server: {0}")]
    Connect(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The response started but could not be read to the end.
    #[error("network error: {0}")]
    Network(String),

    /// The circuit breaker short-circuited the call.
    #[error("circuit breaker is open, next attempt in {}ms", .retry_in.as_millis())]
    CircuitOpen { retry_in: Duration },

    /// The call held its admission slot longer than the configured deadline.
    #[error("call exceeded deadline of {}ms", .0.as_millis())]
    DeadlineExceeded(Duration),

    /// The request could not be built (bad path, bad header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The client was closed; no new calls are admitted.
    #[error("client is closed")]
    Closed,
}

impl ApiError {
    /// Classify this failure for retry and breaker decisions.
    pub fn failure_class(&self) -> FailureClass {
        match self {
            ApiError::Timeout(_) | ApiError::Connect(_) => FailureClass::ColdBackend,
            ApiError::Http { status: 503, .. } => FailureClass::ColdBackend,
            ApiError::Http { status, .. } if *status >= 500 => FailureClass::Server,
            ApiError::Http { .. } => FailureClass::Client,
            ApiError::Network(_) => FailureClass::Server,
            ApiError::InvalidRequest(_) => FailureClass::Client,
            ApiError::CircuitOpen { .. } | ApiError::DeadlineExceeded(_) | ApiError::Closed => {
                FailureClass::Local
            }
        }
    }

    /// True when no usable response came back from the server.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout(_) | ApiError::Connect(_) | ApiError::Network(_)
        )
    }

    /// True for 5xx responses.
    pub fn is_server_error(&self) -> bool {
        matches!(self, ApiError::Http { status, .. } if *status >= 500)
    }

    /// True for 4xx responses and requests that could not be built.
    pub fn is_client_error(&self) -> bool {
        match self {
            ApiError::Http { status, .. } => (400..500).contains(status),
            ApiError::InvalidRequest(_) => true,
            _ => false,
        }
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable message suitable for showing to a user.
    ///
    /// For HTTP errors this is the server-provided detail when there was one.
    pub fn message(&self) -> String {
        match self {
            ApiError::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Short label used for metrics.
    pub fn kind_label(&self) -> &'static str {
        match self {
            ApiError::Timeout(_) => "timeout",
            ApiError::Connect(_) => "connect",
            ApiError::Http { .. } => "http",
            ApiError::Network(_) => "network",
            ApiError::CircuitOpen { .. } => "circuit_open",
            ApiError::DeadlineExceeded(_) => "deadline",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::Closed => "closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> ApiError {
        ApiError::Http {
            status,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_cold_backend_signatures() {
        assert_eq!(
            ApiError::Timeout("slow".into()).failure_class(),
            FailureClass::ColdBackend
        );
        assert_eq!(
            ApiError::Connect("refused".into()).failure_class(),
            FailureClass::ColdBackend
        );
        assert_eq!(http(503).failure_class(), FailureClass::ColdBackend);
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(http(500).failure_class(), FailureClass::Server);
        assert_eq!(http(502).failure_class(), FailureClass::Server);
        assert_eq!(http(400).failure_class(), FailureClass::Client);
        assert_eq!(http(404).failure_class(), FailureClass::Client);
        assert_eq!(
            ApiError::Network("reset".into()).failure_class(),
            FailureClass::Server
        );
        assert_eq!(
            ApiError::CircuitOpen {
                retry_in: Duration::from_secs(1)
            }
            .failure_class(),
            FailureClass::Local
        );
    }

    #[test]
    fn test_flags() {
        assert!(http(422).is_client_error());
        assert!(!http(422).is_server_error());
        assert!(http(500).is_server_error());
        assert!(ApiError::Timeout("t".into()).is_network_error());
        assert!(!http(500).is_network_error());
        assert_eq!(http(409).status(), Some(409));
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Http {
            status: 400,
            message: "Event overlaps an existing event".into(),
        };
        assert_eq!(err.to_string(), "HTTP 400: Event overlaps an existing event");
        assert_eq!(err.message(), "Event overlaps an existing event");

        let err = ApiError::CircuitOpen {
            retry_in: Duration::from_millis(1500),
        };
        assert!(err.to_string().contains("1500ms"));
    }
}
