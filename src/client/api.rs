//! The client facade and its call pipeline.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::cache::{CacheSweeper, PendingCalls, ResponseCache};
use crate::config::{validate_config, ClientConfig, ConfigError};
use crate::error::ApiResult;
use crate::http::{ApiResponse, CallDescriptor, ReqwestTransport, Transport};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::resilience::{
    with_deadline, AdmissionQueue, CircuitBreaker, RetryCoordinator, RetryPolicy, WarmingNotifier,
    WarmingState, WarmingSubscription,
};

/// Resilient client for the calendar backend.
///
/// Cloning is cheap; clones share the cache, breaker, queue and warming state.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    transport: Arc<dyn Transport>,
    pub(crate) cache: ResponseCache,
    pub(crate) pending: PendingCalls<ApiResponse>,
    pub(crate) queue: AdmissionQueue,
    pub(crate) breaker: CircuitBreaker,
    retry: RetryCoordinator,
    pub(crate) warming: WarmingNotifier,
    call_deadline: Option<Duration>,
    sweep_interval: Duration,
}

impl ApiClient {
    /// Validate `config` and build a client over HTTP.
    pub fn from_config(config: ClientConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let transport = ReqwestTransport::new(&config.base_url, &config.timeouts)?;

        tracing::info!(
            base_url = %transport.base_url(),
            max_concurrent = config.max_concurrent,
            "Calendar client configured"
        );

        Ok(Self::with_transport(&config, Arc::new(transport)))
    }

    /// Build a client over any transport. `config` is used as given.
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let warming = WarmingNotifier::new(config.warming.max_attempts);
        let retry = RetryCoordinator::new(
            RetryPolicy::from_config(&config.retry, &config.warming),
            warming.clone(),
        );

        Self {
            inner: Arc::new(ClientInner {
                transport,
                cache: ResponseCache::new(config.cache.ttl()),
                pending: PendingCalls::new(),
                queue: AdmissionQueue::new(config.max_concurrent),
                breaker: CircuitBreaker::new(
                    config.circuit_breaker.failure_threshold,
                    Duration::from_millis(config.circuit_breaker.reset_timeout_ms),
                ),
                retry,
                warming,
                call_deadline: config.timeouts.call_deadline(),
                sweep_interval: config.cache.sweep_interval(),
            }),
        }
    }

    /// Issue one call through cache, de-duplication and the resilience pipeline.
    pub async fn request(&self, request: CallDescriptor) -> ApiResult<ApiResponse> {
        let start = Instant::now();
        let method = request.method;
        let key = request.cache_key();

        if method.is_read() {
            let hit = self.inner.cache.get(&key);
            metrics::record_cache_lookup(hit.is_some());
            if let Some(response) = hit {
                tracing::debug!(key = %key, "Cache hit");
                metrics::record_request(method.as_str(), "cache_hit", start);
                return Ok(response);
            }
        }

        let inner = Arc::clone(&self.inner);
        let dispatch_key = key.clone();
        let call = self
            .inner
            .pending
            .coalesce(&key, move || inner.dispatch(request, dispatch_key));

        let result = call.await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind_label(),
        };
        metrics::record_request(method.as_str(), outcome, start);
        result
    }

    pub async fn get(&self, path: impl Into<String>) -> ApiResult<ApiResponse> {
        self.request(CallDescriptor::get(path)).await
    }

    pub async fn get_with_query<I, K, V>(&self, path: impl Into<String>, query: I) -> ApiResult<ApiResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let request = query
            .into_iter()
            .fold(CallDescriptor::get(path), |request, (k, v)| request.with_query(k, v));
        self.request(request).await
    }

    pub async fn post(&self, path: impl Into<String>, body: Value) -> ApiResult<ApiResponse> {
        self.request(CallDescriptor::post(path, body)).await
    }

    pub async fn put(&self, path: impl Into<String>, body: Value) -> ApiResult<ApiResponse> {
        self.request(CallDescriptor::put(path, body)).await
    }

    pub async fn patch(&self, path: impl Into<String>, body: Value) -> ApiResult<ApiResponse> {
        self.request(CallDescriptor::patch(path, body)).await
    }

    pub async fn delete(&self, path: impl Into<String>) -> ApiResult<ApiResponse> {
        self.request(CallDescriptor::delete(path)).await
    }

    pub fn clear_cache(&self) {
        self.inner.cache.clear();
        tracing::info!("Response cache cleared");
    }

    pub fn reset_circuit_breaker(&self) {
        self.inner.breaker.reset();
    }

    /// Observe cold-backend warming. Keep the subscription alive to keep listening.
    pub fn on_warming_change<F>(&self, listener: F) -> WarmingSubscription
    where
        F: Fn(WarmingState) + Send + Sync + 'static,
    {
        self.inner.warming.subscribe(listener)
    }

    pub fn warming_state(&self) -> WarmingState {
        self.inner.warming.current()
    }

    /// Reject queued and future calls with `ApiError::Closed`.
    pub fn close(&self) {
        self.inner.queue.close();
        tracing::info!("Calendar client closed");
    }

    /// Start the periodic cache sweep; it stops when `shutdown` fires.
    pub fn spawn_cache_sweeper(&self, shutdown: &Shutdown) -> JoinHandle<()> {
        let sweeper = CacheSweeper::new(self.inner.cache.clone(), self.inner.sweep_interval);
        tokio::spawn(sweeper.run(shutdown.subscribe()))
    }
}

impl ClientInner {
    async fn dispatch(self: Arc<Self>, request: CallDescriptor, key: String) -> ApiResult<ApiResponse> {
        let admitted = self.queue.add(self.breaker.execute(|| {
            self.retry.execute(|| self.transport.call(&request))
        }));
        let response = with_deadline(self.call_deadline, admitted).await?;

        if request.method.is_read() {
            self.cache.set(key, response.clone());
        } else {
            self.cache.clear();
            tracing::debug!(method = %request.method, path = %request.path, "Cache invalidated after write");
        }

        Ok(response)
    }
}
