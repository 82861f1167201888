//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check that names used to build the backend environment are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ShimConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ShimConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("backend.program must not be empty")]
    EmptyProgram,

    #[error("backend.port must be non-zero")]
    ZeroPort,

    #[error("backend.{field} {value:?} is not a valid environment variable name")]
    VariableName { field: &'static str, value: String },

    #[error("forwarder.host must not be empty")]
    EmptyHost,

    #[error("forwarder.timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ShimConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let backend = &config.backend;
    if backend.program.trim().is_empty() {
        errors.push(ValidationError::EmptyProgram);
    }
    if backend.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    for (field, value) in [("mode_var", &backend.mode_var), ("port_var", &backend.port_var)] {
        if !is_variable_name(value) {
            errors.push(ValidationError::VariableName {
                field,
                value: value.clone(),
            });
        }
    }
    for name in backend.env.keys() {
        if !is_variable_name(name) {
            errors.push(ValidationError::VariableName {
                field: "env",
                value: name.clone(),
            });
        }
    }

    if config.forwarder.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.forwarder.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('=') && !name.contains('\0')
}
