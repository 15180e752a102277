//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call from ApiClient:
//!     → timeouts.rs (optional whole-call deadline)
//!     → admission.rs (wait for a concurrency slot, FIFO)
//!     → circuit_breaker.rs (fail fast while open, count failures)
//!     → retries.rs (backoff for 5xx, fixed cadence for cold backend)
//!         → warming.rs (notify listeners of wake-up progress)
//!     → transport
//! ```
//!
//! # Design Decisions
//! - One instance of each component per client, shared by all callers
//! - The breaker sees one outcome per logical call, after retries
//! - Every guard is RAII so cancellation cannot leak a slot or a probe

pub mod admission;
pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;
pub mod warming;

pub use admission::{AdmissionQueue, QueueSnapshot};
pub use backoff::calculate_backoff;
pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot, CircuitState};
pub use retries::{RetryCoordinator, RetryPolicy};
pub use timeouts::with_deadline;
pub use warming::{WarmingNotifier, WarmingState, WarmingSubscription};
