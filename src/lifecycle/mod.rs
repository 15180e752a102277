//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Build ApiClient → spawn_cache_sweeper
//!
//! Shutdown (shutdown.rs):
//!     trigger() → sweeper exits its loop → ApiClient::close rejects new calls
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
