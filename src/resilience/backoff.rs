//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Lower bound of the jitter multiplier.
pub const JITTER_MIN: f64 = 0.5;
/// Upper bound (exclusive) of the jitter multiplier.
pub const JITTER_MAX: f64 = 1.0;

/// Calculate the delay before retry number `attempt` (0-based) with random jitter.
///
/// `delay = min(max, base * factor^attempt * jitter)`, jitter uniform in [0.5, 1.0).
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration, factor: f64) -> Duration {
    let jitter = rand::thread_rng().gen_range(JITTER_MIN..JITTER_MAX);
    backoff_with_jitter(attempt, base, max, factor, jitter)
}

/// Deterministic core of [`calculate_backoff`].
pub fn backoff_with_jitter(
    attempt: u32,
    base: Duration,
    max: Duration,
    factor: f64,
    jitter: f64,
) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let raw = base.as_secs_f64() * factor.powi(exponent) * jitter;
    // f64::min drops NaN, and an overflowed power is capped here.
    let capped = raw.min(max.as_secs_f64()).max(0.0);
    Duration::from_secs_f64(capped)
}
