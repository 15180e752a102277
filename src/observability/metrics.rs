//! Metrics collection.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding application installs a recorder.
//!
//! # Metrics
//! - `calendar_client_requests_total` (counter): logical calls by method, outcome
//! - `calendar_client_request_duration_seconds` (histogram): call latency
//! - `calendar_client_cache_lookups_total` (counter): read lookups by result
//! - `calendar_client_retries_total` (counter): retries by failure class
//! - `calendar_client_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `calendar_client_queue_waiting` (gauge): calls waiting for admission

use metrics::{counter, gauge, histogram};
use tokio::time::Instant;

use crate::resilience::CircuitState;

pub fn record_request(method: &'static str, outcome: &'static str, start: Instant) {
    counter!("calendar_client_requests_total", "method" => method, "outcome" => outcome)
        .increment(1);
    histogram!("calendar_client_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("calendar_client_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_retry(class: &'static str) {
    counter!("calendar_client_retries_total", "class" => class).increment(1);
}

pub fn record_circuit_state(state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    gauge!("calendar_client_circuit_state").set(value);
}

pub fn record_queue_waiting(waiting: usize) {
    gauge!("calendar_client_queue_waiting").set(waiting as f64);
}
