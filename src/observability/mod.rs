//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Resilience, cache and client layers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!
//! Consumers:
//!     → stderr/stdout through the fmt subscriber
//!     → whichever metrics recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - Every outbound call carries an `x-request-id` that also appears in logs
//! - Metric updates are no-ops without a recorder

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
