//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → handed to ApiClient at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the client is built
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The resilience core never reads files or environment itself

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CacheConfig, CircuitBreakerConfig, ClientConfig, ObservabilityConfig, RetryConfig,
    TimeoutConfig, WarmingConfig,
};
pub use validation::{validate_config, ValidationError};
