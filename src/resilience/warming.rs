//! Cold-backend ("warming") state and its observers.
//!
//! The hosted backend sleeps after inactivity; the first calls after that
//! time out or get 503s for tens of seconds. The retry coordinator reports
//! each warming retry here so a UI can show "waking up" instead of an error.

use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;

/// Snapshot handed to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WarmingState {
    pub is_warming: bool,
    pub attempt: u32,
    pub max_attempts: u32,
}

type Listener = Arc<dyn Fn(WarmingState) + Send + Sync>;

struct Registry {
    state: WarmingState,
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

type Shared = Mutex<Registry>;

/// Observable warming state, one per client.
#[derive(Clone)]
pub struct WarmingNotifier {
    shared: Arc<Shared>,
}

impl WarmingNotifier {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Registry {
                state: WarmingState {
                    is_warming: false,
                    attempt: 0,
                    max_attempts,
                },
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register `listener`; it stays registered until the returned
    /// subscription is dropped or unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> WarmingSubscription
    where
        F: Fn(WarmingState) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.shared);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));

        WarmingSubscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn current(&self) -> WarmingState {
        lock(&self.shared).state
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.shared).listeners.len()
    }

    /// Update the state and notify every listener synchronously.
    pub(crate) fn set(&self, is_warming: bool, attempt: u32) {
        let (snapshot, listeners) = {
            let mut registry = lock(&self.shared);
            registry.state.is_warming = is_warming;
            registry.state.attempt = attempt;
            let listeners: Vec<Listener> = registry
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            (registry.state, listeners)
        };

        // Called outside the lock so listeners may (un)subscribe.
        for listener in listeners {
            listener(snapshot);
        }
    }
}

fn lock(shared: &Shared) -> std::sync::MutexGuard<'_, Registry> {
    shared.lock().expect("warming registry mutex poisoned")
}

/// Handle for a registered listener. Dropping it unsubscribes.
pub struct WarmingSubscription {
    id: u64,
    shared: Weak<Shared>,
}

impl WarmingSubscription {
    pub fn unsubscribe(self) {}
}

impl Drop for WarmingSubscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared).listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
