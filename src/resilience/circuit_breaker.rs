//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: backend assumed down, calls fail fast
//! - Half-Open: testing if backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: first call after reset_timeout has elapsed
//! Half-Open → Closed: probe call succeeds
//! Half-Open → Open: probe call fails
//! ```
//!
//! # Design Decisions
//! - One breaker per client, shared by every caller
//! - Fail fast in Open state (the wrapped operation is never invoked)
//! - Single probe in Half-Open; other callers are rejected until it settles
//! - Only server-side failures count; a 4xx proves the backend is answering

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::error::{ApiError, ApiResult, FailureClass};
use crate::observability::metrics;
use crate::resilience::timeouts::millis;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Read-only view of the breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failures: u32,
    /// Time until the next attempt is allowed, while open.
    pub retry_in_ms: Option<u64>,
}

struct BreakerInner {
    state: CircuitState,
    failures: u32,
    last_failure: Option<Instant>,
    next_attempt: Option<Instant>,
    probe_in_flight: bool,
}

/// Failure-counting guard around an operation.
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                last_failure: None,
                next_attempt: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Run `operation` unless the circuit is open.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut permit = self.acquire()?;
        let result = operation().await;

        let failed = matches!(
            &result,
            Err(e) if matches!(e.failure_class(), FailureClass::Server | FailureClass::ColdBackend)
        );
        if failed {
            self.on_failure(permit.probe);
        } else {
            self.on_success(permit.probe);
        }
        permit.settled = true;

        result
    }

    /// Force the breaker back to Closed.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.next_attempt = None;
        inner.probe_in_flight = false;
        drop(inner);

        tracing::info!("Circuit breaker reset");
        metrics::record_circuit_state(CircuitState::Closed);
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failures(&self) -> u32 {
        self.lock().failures
    }

    /// Instant of the most recent counted failure.
    pub fn last_failure(&self) -> Option<Instant> {
        self.lock().last_failure
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        let now = Instant::now();
        let retry_in_ms = match inner.state {
            CircuitState::Open => inner
                .next_attempt
                .map(|at| millis(at.saturating_duration_since(now))),
            _ => None,
        };
        CircuitSnapshot {
            state: inner.state,
            failures: inner.failures,
            retry_in_ms,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().expect("circuit breaker mutex poisoned")
    }

    fn acquire(&self) -> ApiResult<Permit<'_>> {
        let mut inner = self.lock();
        let state = inner.state;
        match state {
            CircuitState::Closed => Ok(Permit::new(self, false)),
            CircuitState::Open => {
                let now = Instant::now();
                match inner.next_attempt {
                    Some(at) if now < at => Err(ApiError::CircuitOpen {
                        retry_in: at - now,
                    }),
                    _ => {
                        inner.state = CircuitState::HalfOpen;
                        inner.probe_in_flight = true;
                        drop(inner);
                        tracing::info!("Circuit half-open, sending probe");
                        metrics::record_circuit_state(CircuitState::HalfOpen);
                        Ok(Permit::new(self, true))
                    }
                }
            }
            CircuitState::HalfOpen if inner.probe_in_flight => Err(ApiError::CircuitOpen {
                retry_in: Duration::ZERO,
            }),
            CircuitState::HalfOpen => {
                inner.probe_in_flight = true;
                Ok(Permit::new(self, true))
            }
        }
    }

    fn on_success(&self, probe: bool) {
        let mut inner = self.lock();
        let state = inner.state;
        match state {
            CircuitState::Closed => inner.failures = 0,
            CircuitState::HalfOpen if probe => {
                inner.state = CircuitState::Closed;
                inner.failures = 0;
                inner.next_attempt = None;
                inner.probe_in_flight = false;
                drop(inner);
                tracing::info!("Probe succeeded, circuit closed");
                metrics::record_circuit_state(CircuitState::Closed);
            }
            // Stragglers admitted before the circuit opened do not decide anything.
            _ => {}
        }
    }

    fn on_failure(&self, probe: bool) {
        let mut inner = self.lock();
        let now = Instant::now();
        inner.last_failure = Some(now);

        let from = inner.state;
        let trip = match from {
            CircuitState::Closed => {
                inner.failures += 1;
                inner.failures >= self.failure_threshold
            }
            CircuitState::HalfOpen => probe,
            CircuitState::Open => false,
        };
        if !trip {
            return;
        }

        inner.state = CircuitState::Open;
        inner.failures = 0;
        inner.next_attempt = Some(now + self.reset_timeout);
        inner.probe_in_flight = false;
        drop(inner);

        tracing::warn!(
            from = ?from,
            reset_timeout_ms = millis(self.reset_timeout),
            "Circuit opened"
        );
        metrics::record_circuit_state(CircuitState::Open);
    }

    fn release_probe(&self) {
        self.lock().probe_in_flight = false;
    }
}

/// Admission ticket for one call. Releases the half-open probe slot if the
/// call is dropped before it settles.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            settled: false,
        }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.probe && !self.settled {
            self.breaker.release_probe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error() -> ApiResult<()> {
        Err(ApiError::Http {
            status: 500,
            message: "boom".into(),
        })
    }

    async fn fail(breaker: &CircuitBreaker) -> ApiResult<()> {
        breaker.execute(|| async { server_error() }).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_trips_after_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        for _ in 0..3 {
            assert!(matches!(fail(&breaker).await, Err(ApiError::Http { .. })));
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.failures(), 0);

        let mut invoked = false;
        let result = breaker
            .execute(|| {
                invoked = true;
                async { Ok(()) }
            })
            .await;
        assert!(matches!(result, Err(ApiError::CircuitOpen { .. })));
        assert!(!invoked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_consecutive_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        fail(&breaker).await.unwrap_err();
        fail(&breaker).await.unwrap_err();
        breaker.execute(|| async { Ok(()) }).await.unwrap();
        assert_eq!(breaker.failures(), 0);
        fail(&breaker).await.unwrap_err();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_errors_do_not_count() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(30));
        let result: ApiResult<()> = breaker
            .execute(|| async {
                Err(ApiError::Http {
                    status: 404,
                    message: "missing".into(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_success_closes() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(10));
        fail(&breaker).await.unwrap_err();
        assert_eq!(breaker.snapshot().retry_in_ms, Some(10_000));

        tokio::time::advance(Duration::from_secs(10)).await;
        breaker.execute(|| async { Ok(()) }).await.unwrap();

        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failures, 0);
        assert_eq!(snapshot.retry_in_ms, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(10));
        fail(&breaker).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(11)).await;

        fail(&breaker).await.unwrap_err();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.snapshot().retry_in_ms, Some(10_000));
        assert!(breaker.last_failure().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_probe_in_half_open() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(1));
        fail(&breaker).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(2)).await;

        let probe = breaker.execute(|| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        });
        let second = async {
            tokio::task::yield_now().await;
            breaker.execute(|| async { Ok(()) }).await
        };
        let (probe, second) = tokio::join!(probe, second);
        assert!(probe.is_ok());
        assert!(matches!(second, Err(ApiError::CircuitOpen { .. })));
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_probe_releases_slot() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(1));
        fail(&breaker).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(2)).await;

        let stalled = breaker.execute(|| std::future::pending::<ApiResult<()>>());
        let timed_out = tokio::time::timeout(Duration::from_millis(50), stalled).await;
        assert!(timed_out.is_err());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.execute(|| async { Ok(()) }).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_reset() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        fail(&breaker).await.unwrap_err();
        assert_eq!(breaker.state(), CircuitState::Open);
        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.execute(|| async { Ok(()) }).await.unwrap();
    }
}
