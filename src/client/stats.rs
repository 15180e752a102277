//! Read-only diagnostics for a client.

use serde::Serialize;

use crate::client::ApiClient;
use crate::resilience::{CircuitSnapshot, QueueSnapshot, WarmingState};

#[derive(Debug, Clone, Serialize)]
pub struct ClientStats {
    pub circuit: CircuitSnapshot,
    pub cache_entries: usize,
    pub pending_calls: usize,
    pub queue: QueueSnapshot,
    pub warming: WarmingState,
}

impl ApiClient {
    /// Snapshot of breaker, cache, pending and queue state. No side effects.
    pub fn stats(&self) -> ClientStats {
        let inner = &self.inner;
        ClientStats {
            circuit: inner.breaker.snapshot(),
            cache_entries: inner.cache.len(),
            pending_calls: inner.pending.len(),
            queue: inner.queue.snapshot(),
            warming: inner.warming.current(),
        }
    }
}
