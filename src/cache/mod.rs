//! Response caching and in-flight call coalescing.
//!
//! # Data Flow
//! ```text
//! Read call:
//!     → store.rs (fresh entry? return it)
//!     → pending.rs (same key in flight? share its future)
//!     → resilience pipeline
//!     → store.rs (remember the response for `ttl`)
//!
//! Write call:
//!     → pending.rs → resilience pipeline
//!     → store.rs (clear everything on success)
//!
//! Background:
//!     sweeper.rs → store.rs::sweep() every `sweep_interval`
//! ```
//!
//! # Design Decisions
//! - Both maps are `DashMap`s so lookups never block the runtime
//! - Expiry is checked lazily on read and eagerly by the sweeper
//! - Invalidation on writes is all-or-nothing

pub mod pending;
pub mod store;
pub mod sweeper;

pub use pending::{PendingCalls, SharedCall};
pub use store::ResponseCache;
pub use sweeper::CacheSweeper;
