//! Client facade.
//!
//! # Data Flow
//! ```text
//! ApiClient::request(descriptor)
//!     → cache key
//!     → (read) ResponseCache hit? done
//!     → PendingCalls::coalesce (join an identical in-flight call)
//!     → with_deadline → AdmissionQueue → CircuitBreaker → RetryCoordinator
//!     → Transport::call
//!     → (read) cache the response / (write) clear the cache
//! ```
//!
//! # Design Decisions
//! - One shared `ClientInner` per client; verb helpers only build descriptors
//! - The facade owns every component so tests can build isolated clients

mod api;
mod bulk;
mod stats;

pub use api::ApiClient;
pub use bulk::BulkOutcome;
pub use stats::ClientStats;
