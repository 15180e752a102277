//! Transport abstraction and the reqwest-backed implementation.
//!
//! # Responsibilities
//! - Perform exactly one HTTP exchange per `call`
//! - Report failures so that "no response received" is distinguishable from
//!   "response received with an error status"
//!
//! # Design Decisions
//! - No retries here; the resilience pipeline owns retry policy
//! - reqwest's own connect/request timeouts are what surface a sleeping
//!   backend as `ApiError::Timeout`
//! - Every call carries a fresh `x-request-id` for correlation with backend logs

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::config::{ConfigError, TimeoutConfig};
use crate::error::{ApiError, ApiResult};
use crate::http::request::{CallDescriptor, X_REQUEST_ID};
use crate::http::response::{extract_error_message, ApiResponse};

/// The single outbound primitive the pipeline wraps.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the call. Non-2xx statuses come back as `ApiError::Http`.
    async fn call(&self, request: &CallDescriptor) -> ApiResult<ApiResponse>;
}

/// Transport over a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Build a transport rooted at `base_url`.
    pub fn new(base_url: &str, timeouts: &TimeoutConfig) -> Result<Self, ConfigError> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join replaces the last segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(timeouts.connect_ms))
            .timeout(Duration::from_millis(timeouts.request_ms))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `path` under the base URL. Paths that resolve to another
    /// origin (absolute URLs) are rejected.
    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("invalid path '{}': {}", path, e)))?;

        if url.origin() != self.base_url.origin() {
            return Err(ApiError::InvalidRequest(format!(
                "path '{}' leaves the configured base URL",
                path
            )));
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn call(&self, request: &CallDescriptor) -> ApiResult<ApiResponse> {
        let url = self.endpoint(&request.path)?;
        let request_id = Uuid::new_v4().to_string();

        tracing::debug!(
            request_id = %request_id,
            method = %request.method,
            url = %url,
            "Sending request"
        );

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .header(X_REQUEST_ID, request_id.as_str());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify_send_error)?;
        let status = response.status().as_u16();

        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(e.to_string())
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        if !(200..300).contains(&status) {
            let message = extract_error_message(status, &body);
            tracing::debug!(
                request_id = %request_id,
                status,
                message = %message,
                "Server returned error status"
            );
            return Err(ApiError::Http { status, message });
        }

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// Map a failure that happened before any response arrived.
fn classify_send_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(err.to_string())
    } else if err.is_builder() {
        ApiError::InvalidRequest(err.to_string())
    } else {
        ApiError::Connect(err.to_string())
    }
}
