//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound a whole logical call (queueing, retries, warming) by one deadline
//! - Cancel the wrapped future cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Per-attempt connect/request timeouts live on the transport; this is the
//!   outer, optional budget and is off unless configured
//! - Deadline errors are distinct from transport timeouts so they are never
//!   mistaken for a sleeping backend

use std::future::Future;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

/// Await `future`, failing with [`ApiError::DeadlineExceeded`] after `deadline`.
pub async fn with_deadline<F, T>(deadline: Option<Duration>, future: F) -> ApiResult<T>
where
    F: Future<Output = ApiResult<T>>,
{
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, future).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(deadline_ms = millis(limit), "Call deadline exceeded");
                Err(ApiError::DeadlineExceeded(limit))
            }
        },
        None => future.await,
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
