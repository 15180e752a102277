//! Resilient HTTP client for a calendar backend that sleeps when idle.
//!
//! Every call flows through one pipeline:
//!
//! ```text
//! ApiClient ─▶ cache ─▶ de-duplication ─▶ admission queue ─▶ circuit breaker
//!                                                               │
//!                             transport ◀─ retry coordinator ◀──┘
//!                                                │
//!                                          warming notifier
//! ```
//!
//! Reads are cached for a TTL, identical in-flight calls share one transport
//! invocation, at most `max_concurrent` calls run at once, and a backend that
//! is waking up is retried on a short fixed cadence while listeners are told
//! it is warming.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use client::{ApiClient, BulkOutcome, ClientStats};
pub use config::{load_config, ClientConfig, ConfigError};
pub use error::{ApiError, ApiResult, FailureClass};
pub use http::{ApiResponse, CallDescriptor, Method, Transport};
pub use lifecycle::Shutdown;
pub use resilience::{CircuitState, WarmingState, WarmingSubscription};
