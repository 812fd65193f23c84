//! Configuration validation.
//!
//! Semantic checks only; serde handles the syntactic ones. Every problem is
//! reported, not just the first.

use std::net::SocketAddr;

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::ledger::gas::GasPolicy;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let ledger = &config.ledger;
    if let Err(e) = ledger.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::new("ledger.rpc_url", format!("invalid URL: {}", e)));
    }
    for (i, failover) in ledger.failover_urls.iter().enumerate() {
        if let Err(e) = failover.parse::<url::Url>() {
            errors.push(ValidationError::new(
                format!("ledger.failover_urls[{}]", i),
                format!("invalid URL: {}", e),
            ));
        }
    }
    if ledger.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("ledger.rpc_timeout_secs", "must be greater than 0"));
    }
    if ledger.receipt_poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "ledger.receipt_poll_interval_ms",
            "must be greater than 0",
        ));
    }
    if ledger.priority_fee_gwei > ledger.fallback_max_fee_gwei {
        errors.push(ValidationError::new(
            "ledger.fallback_max_fee_gwei",
            "must not be below priority_fee_gwei",
        ));
    }

    if let Some(address) = &config.registry.address {
        if address.parse::<Address>().is_err() {
            errors.push(ValidationError::new("registry.address", "not a valid address"));
        }
    }

    check_gas_policy("gas.deploy", &config.gas.deploy, &mut errors);
    check_gas_policy("gas.publish", &config.gas.publish, &mut errors);
    check_gas_policy("gas.ack", &config.gas.ack, &mut errors);

    if config.gateway.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("gateway.bind_address", "not a socket address"));
    }
    if config.gateway.default_device_type.trim().is_empty() {
        errors.push(ValidationError::new("gateway.default_device_type", "must not be empty"));
    }
    if config.gateway.max_body_size == 0 {
        errors.push(ValidationError::new("gateway.max_body_size", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_gas_policy(field: &str, policy: &GasPolicy, errors: &mut Vec<ValidationError>) {
    if policy.multiplier == 0 {
        errors.push(ValidationError::new(
            format!("{}.multiplier", field),
            "must be at least 1",
        ));
    }
    if policy.fallback_limit == Some(0) {
        errors.push(ValidationError::new(
            format!("{}.fallback_limit", field),
            "must be greater than 0 when set",
        ));
    }
}
