//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (rates > 0, retention ≥ sweep interval)
//! - Check fixture credentials are well-formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatekeeperConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatekeeperConfig;
use crate::security::credential;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("users[{index}]: {reason}")]
    InvalidFixture { index: usize, reason: String },
}

impl ValidationError {
    fn value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatekeeperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::value(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::value("timeouts.request_secs", "must be greater than zero"));
    }

    let limiter = &config.limiter;
    if !(limiter.requests_per_second.is_finite() && limiter.requests_per_second > 0.0) {
        errors.push(ValidationError::value(
            "limiter.requests_per_second",
            "must be a positive number",
        ));
    }
    if limiter.burst == 0 {
        errors.push(ValidationError::value("limiter.burst", "must be at least 1"));
    }
    if limiter.sweep_interval_secs == 0 {
        errors.push(ValidationError::value(
            "limiter.sweep_interval_secs",
            "must be greater than zero",
        ));
    } else if limiter.retention_secs < limiter.sweep_interval_secs {
        errors.push(ValidationError::value(
            "limiter.retention_secs",
            "must not be shorter than the sweep interval",
        ));
    }

    if config.shutdown.grace_period_secs == 0 {
        errors.push(ValidationError::value(
            "shutdown.grace_period_secs",
            "must be greater than zero",
        ));
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::value(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    for (index, user) in config.users.iter().enumerate() {
        if !credential::validate(&user.token) {
            errors.push(ValidationError::InvalidFixture {
                index,
                reason: "token must be 26 base-32 characters".to_string(),
            });
        }
        if user.email.trim().is_empty() {
            errors.push(ValidationError::InvalidFixture {
                index,
                reason: "email must not be empty".to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
