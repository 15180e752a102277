//! In-flight call de-duplication.
//!
//! Concurrent callers asking for the same key share one underlying future.
//! The registry only holds a weak handle: when every caller has gone away the
//! future is dropped and its entry removed, so an abandoned call cannot pin
//! the key.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared, WeakShared};

use crate::error::ApiResult;

/// Future handed to every caller of one coalesced key.
pub type SharedCall<T> = Shared<BoxFuture<'static, ApiResult<T>>>;

struct PendingEntry<T> {
    id: u64,
    // `None` once the call has already produced its output.
    call: Option<WeakShared<BoxFuture<'static, ApiResult<T>>>>,
}

impl<T> PendingEntry<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn upgrade(&self) -> Option<SharedCall<T>> {
        self.call.as_ref().and_then(WeakShared::upgrade)
    }
}

type Registry<T> = DashMap<String, PendingEntry<T>>;

pub struct PendingCalls<T> {
    inner: Arc<Registry<T>>,
    next_id: AtomicU64,
}

impl<T> PendingCalls<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the in-flight call for `key`, or start one with `factory`.
    ///
    /// `factory` runs under the registry's shard lock and must not touch the
    /// registry itself; it should only build the future.
    pub fn coalesce<F, Fut>(&self, key: &str, factory: F) -> SharedCall<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        match self.inner.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if let Some(call) = occupied.get().upgrade() {
                    tracing::debug!(key, "Joining in-flight call");
                    return call;
                }
                // Every previous caller dropped out; start over.
                let (entry, call) = self.start(key, factory);
                occupied.insert(entry);
                call
            }
            Entry::Vacant(vacant) => {
                let (entry, call) = self.start(key, factory);
                vacant.insert(entry);
                call
            }
        }
    }

    /// Keys with a call in flight.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn start<F, Fut>(&self, key: &str, factory: F) -> (PendingEntry<T>, SharedCall<T>)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cleanup = Cleanup {
            registry: Arc::downgrade(&self.inner),
            key: key.to_string(),
            id,
        };
        let operation = factory();

        let call = async move {
            let _cleanup = cleanup;
            operation.await
        }
        .boxed()
        .shared();

        let entry = PendingEntry {
            id,
            call: call.downgrade(),
        };
        (entry, call)
    }
}

impl<T> Default for PendingCalls<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the registry entry when the call settles or is dropped.
struct Cleanup<T> {
    registry: Weak<Registry<T>>,
    key: String,
    id: u64,
}

impl<T> Drop for Cleanup<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_if(&self.key, |_, entry| entry.id == self.id);
        }
    }
}
