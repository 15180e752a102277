//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the API client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every call path is resolved against.
    pub base_url: String,

    /// Maximum number of calls allowed to reach the transport at once.
    pub max_concurrent: usize,

    /// Retry configuration for ordinary failures.
    pub retry: RetryConfig,

    /// Circuit breaker configuration.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Response cache configuration.
    pub cache: CacheConfig,

    /// Cold-backend (warming) retry cadence.
    pub warming: WarmingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            max_concurrent: 5,
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            cache: CacheConfig::default(),
            warming: WarmingConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Growth factor applied per retry.
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            factor: 2.0,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// How long the circuit stays open before a probe is allowed, in milliseconds.
    pub reset_timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 60_000,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live of a cached GET response in milliseconds.
    pub ttl_ms: u64,

    /// Interval of the background expiry sweep in milliseconds.
    pub sweep_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 5 * 60 * 1000,
            sweep_interval_ms: 60_000,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Cold-backend retry cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WarmingConfig {
    /// Warming retries allowed for one call.
    pub max_attempts: u32,

    /// Fixed delay between warming retries in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for WarmingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay_ms: 2000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Total time for one request/response exchange in milliseconds.
    pub request_ms: u64,

    /// Optional ceiling on one admitted call including all of its retries.
    /// Unset means a call may hold its admission slot indefinitely.
    pub call_deadline_ms: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 10_000,
            request_ms: 30_000,
            call_deadline_ms: None,
        }
    }
}

impl TimeoutConfig {
    pub fn call_deadline(&self) -> Option<Duration> {
        self.call_deadline_ms.map(Duration::from_millis)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
