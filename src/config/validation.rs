//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (concurrency > 0, factor > 0, base <= max delay)
//! - Check the base URL parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::ClientConfig;

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check every semantic constraint on `config`.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = url::Url::parse(&config.base_url) {
        errors.push(ValidationError::new("base_url", format!("not a valid URL ({})", e)));
    }

    if config.max_concurrent == 0 {
        errors.push(ValidationError::new("max_concurrent", "must be at least 1"));
    }

    let retry = &config.retry;
    if !(retry.factor.is_finite() && retry.factor > 0.0) {
        errors.push(ValidationError::new("retry.factor", "must be a positive number"));
    }
    if retry.base_delay_ms > retry.max_delay_ms {
        errors.push(ValidationError::new(
            "retry.base_delay_ms",
            format!(
                "{} exceeds retry.max_delay_ms ({})",
                retry.base_delay_ms, retry.max_delay_ms
            ),
        ));
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_threshold",
            "must be at least 1",
        ));
    }

    if config.cache.ttl_ms == 0 {
        errors.push(ValidationError::new("cache.ttl_ms", "must be greater than 0"));
    }
    if config.cache.sweep_interval_ms == 0 {
        errors.push(ValidationError::new(
            "cache.sweep_interval_ms",
            "must be greater than 0",
        ));
    }

    if config.warming.max_attempts == 0 {
        errors.push(ValidationError::new("warming.max_attempts", "must be at least 1"));
    }

    if config.timeouts.request_ms == 0 {
        errors.push(ValidationError::new("timeouts.request_ms", "must be greater than 0"));
    }
    if config.timeouts.call_deadline_ms == Some(0) {
        errors.push(ValidationError::new(
            "timeouts.call_deadline_ms",
            "must be greater than 0 when set",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
