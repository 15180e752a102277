//! Bounded-concurrency admission queue.
//!
//! # Responsibilities
//! - Cap the number of calls in flight against the backend
//! - Start waiting calls strictly in arrival order
//! - Expose running / waiting counts for diagnostics
//!
//! # Design Decisions
//! - Backed by Tokio's fair semaphore; its waiter list is the FIFO queue
//! - Permits are RAII: a finished, failed or cancelled task frees its slot
//! - Dropping a queued future removes it from the queue without running it

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::error::{ApiError, ApiResult};
use crate::observability::metrics;

/// Point-in-time queue counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    pub capacity: usize,
    pub running: usize,
    pub waiting: usize,
}

pub struct AdmissionQueue {
    permits: Semaphore,
    capacity: usize,
    waiting: AtomicUsize,
}

impl AdmissionQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Semaphore::new(capacity),
            capacity,
            waiting: AtomicUsize::new(0),
        }
    }

    /// Run `task` once a slot is free and return its outcome unchanged.
    pub async fn add<F, T>(&self, task: F) -> ApiResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        let permit = {
            let _waiting = WaitingGuard::new(&self.waiting);
            self.permits.acquire().await.map_err(|_| ApiError::Closed)?
        };

        let result = task.await;
        drop(permit);
        result
    }

    /// Reject queued and future calls with [`ApiError::Closed`].
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let available = self.permits.available_permits().min(self.capacity);
        QueueSnapshot {
            capacity: self.capacity,
            running: self.capacity - available,
            waiting: self.waiting.load(Ordering::Relaxed),
        }
    }
}

/// Counts a caller as waiting for as long as it is parked on the semaphore.
struct WaitingGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> WaitingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        let waiting = counter.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::record_queue_waiting(waiting);
        Self { counter }
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        let waiting = self.counter.fetch_sub(1, Ordering::Relaxed) - 1;
        metrics::record_queue_waiting(waiting);
    }
}
