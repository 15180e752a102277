//! Retry logic.
//!
//! # Responsibilities
//! - Re-issue failed operations with exponential backoff + jitter
//! - Recognise cold-backend failures and retry them on a fixed short cadence
//! - Report warming progress to the [`WarmingNotifier`]
//!
//! # Design Decisions
//! - Two budgets: `max_retries` for ordinary failures, `warming.max_attempts`
//!   for cold-backend failures; neither consumes the other
//! - A waking backend is probed at a fixed interval rather than on the
//!   exponential schedule, which would overshoot the actual wake-up time
//! - Client errors (4xx) are never retried
//! - Jittered backoff prevents thundering herd

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::config::{RetryConfig, WarmingConfig};
use crate::error::{ApiResult, FailureClass};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::timeouts::millis;
use crate::resilience::warming::WarmingNotifier;

/// Runtime retry parameters, resolved from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub warming_max_attempts: u32,
    pub warming_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(retry: &RetryConfig, warming: &WarmingConfig) -> Self {
        Self {
            max_retries: retry.max_retries,
            base_delay: Duration::from_millis(retry.base_delay_ms),
            max_delay: Duration::from_millis(retry.max_delay_ms),
            factor: retry.factor,
            warming_max_attempts: warming.max_attempts,
            warming_delay: Duration::from_millis(warming.retry_delay_ms),
        }
    }

    /// Delay before ordinary retry number `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay, self.max_delay, self.factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default(), &WarmingConfig::default())
    }
}

/// Drives one operation through its retry budget.
pub struct RetryCoordinator {
    policy: RetryPolicy,
    warming: WarmingNotifier,
}

impl RetryCoordinator {
    pub fn new(policy: RetryPolicy, warming: WarmingNotifier) -> Self {
        Self { policy, warming }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds or its budget is spent.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut retries = 0u32;
        let mut warming_attempts = 0u32;
        let mut warming = WarmingReset::new(&self.warming);

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if warming_attempts > 0 {
                        tracing::info!(attempts = warming_attempts, "Backend is awake");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let delay = match error.failure_class() {
                FailureClass::ColdBackend if warming_attempts < self.policy.warming_max_attempts => {
                    warming_attempts += 1;
                    warming.report(warming_attempts);
                    metrics::record_retry("cold_backend");
                    tracing::warn!(
                        attempt = warming_attempts,
                        max_attempts = self.policy.warming_max_attempts,
                        error = %error,
                        "Backend appears to be waking up, retrying"
                    );
                    self.policy.warming_delay
                }
                FailureClass::Server if retries < self.policy.max_retries => {
                    let delay = self.policy.backoff(retries);
                    retries += 1;
                    metrics::record_retry("server");
                    tracing::info!(
                        attempt = retries,
                        max_retries = self.policy.max_retries,
                        delay_ms = millis(delay),
                        error = %error,
                        "Retrying after server error"
                    );
                    delay
                }
                class => {
                    tracing::debug!(
                        class = ?class,
                        retries,
                        warming_attempts,
                        error = %error,
                        "Giving up"
                    );
                    return Err(error);
                }
            };

            sleep(delay).await;
        }
    }
}

/// Reports "warming ended" when dropped after warming started: on success,
/// on giving up, and when the call is cancelled mid-sequence.
struct WarmingReset<'a> {
    notifier: &'a WarmingNotifier,
    started: bool,
}

impl<'a> WarmingReset<'a> {
    fn new(notifier: &'a WarmingNotifier) -> Self {
        Self {
            notifier,
            started: false,
        }
    }

    fn report(&mut self, attempt: u32) {
        self.started = true;
        self.notifier.set(true, attempt);
    }
}

impl Drop for WarmingReset<'_> {
    fn drop(&mut self) {
        if self.started {
            self.notifier.set(false, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            factor: 2.0,
            warming_max_attempts: 4,
            warming_delay: Duration::from_millis(500),
        }
    }

    fn coordinator() -> (RetryCoordinator, WarmingNotifier) {
        let notifier = WarmingNotifier::new(4);
        (RetryCoordinator::new(policy(), notifier.clone()), notifier)
    }

    fn http(status: u16) -> ApiError {
        ApiError::Http {
            status,
            message: format!("status {}", status),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_not_retried() {
        let (retry, _) = coordinator();
        let calls = AtomicU32::new(0);
        let result: ApiResult<()> = retry
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(http(400)) }
            })
            .await;
        assert_eq!(result.unwrap_err().status(), Some(400));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_exhausts_budget() {
        let (retry, notifier) = coordinator();
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let result: ApiResult<()> = retry
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(http(500)) }
            })
            .await;
        assert_eq!(result.unwrap_err().status(), Some(500));
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        // 100 + 200 + 400 at full jitter, half that at minimum jitter.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(350), "{:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(700), "{:?}", elapsed);
        assert!(!notifier.current().is_warming);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_error() {
        let (retry, _) = coordinator();
        let calls = AtomicU32::new(0);
        let result = retry
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(http(502))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_backend_notifies_and_recovers() {
        let (retry, notifier) = coordinator();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = notifier.subscribe(move |state| sink.lock().unwrap().push(state));

        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let result = retry
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    match n {
                        0 => Err(ApiError::Timeout("no response".into())),
                        1 => Err(http(503)),
                        _ => Ok("awake"),
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "awake");
        assert_eq!(start.elapsed(), Duration::from_millis(1000));

        let seen: Vec<(bool, u32)> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|s| (s.is_warming, s.attempt))
            .collect();
        assert_eq!(seen, vec![(true, 1), (true, 2), (false, 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warming_budget_is_separate_and_capped() {
        let (retry, notifier) = coordinator();
        let calls = AtomicU32::new(0);
        let result: ApiResult<()> = retry
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::Connect("refused".into())) }
            })
            .await;

        assert!(matches!(result, Err(ApiError::Connect(_))));
        // First try plus four warming retries; max_retries is not consulted.
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        let state = notifier.current();
        assert!(!state.is_warming);
        assert_eq!(state.attempt, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_errors_not_retried() {
        let (retry, _) = coordinator();
        let calls = AtomicU32::new(0);
        let result: ApiResult<()> = retry
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ApiError::CircuitOpen {
                        retry_in: Duration::from_secs(1),
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_warming_sequence_ends_warming() {
        let (retry, notifier) = coordinator();
        let call = retry.execute(|| async { Err::<(), _>(ApiError::Timeout("asleep".into())) });

        let abandoned = tokio::time::timeout(Duration::from_millis(700), call).await;
        assert!(abandoned.is_err());

        let state = notifier.current();
        assert!(!state.is_warming);
        assert_eq!(state.attempt, 0);
    }
}
