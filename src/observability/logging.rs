//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate for structured events
//! - `RUST_LOG` wins over the configured level when set
//! - Library code only emits events; installing a subscriber is the binary's job

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .is_ok()
}

fn default_directive(level: &str) -> String {
    format!("calendar_client={level},warn")
}
