//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides the ledger RPC URL.
pub const RPC_URL_ENV_VAR: &str = "FIRMWARE_LEDGER_RPC_URL";
/// Overrides the expected chain ID.
pub const CHAIN_ID_ENV_VAR: &str = "FIRMWARE_LEDGER_CHAIN_ID";
/// Overrides the registry program address.
pub const REGISTRY_ADDRESS_ENV_VAR: &str = "FIRMWARE_LEDGER_REGISTRY_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment override {name}: {message}")]
    Env { name: &'static str, message: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: AppConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> Result<AppConfig, ConfigError> {
    if path.exists() {
        return load_config(path);
    }

    tracing::debug!(path = %path.display(), "Config file not found, using defaults");
    let mut config = AppConfig::default();
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment overrides using the given lookup.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(RPC_URL_ENV_VAR) {
        config.ledger.rpc_url = url;
    }
    if let Some(raw) = lookup(CHAIN_ID_ENV_VAR) {
        let chain_id = raw.trim().parse::<u64>().map_err(|e| ConfigError::Env {
            name: CHAIN_ID_ENV_VAR,
            message: e.to_string(),
        })?;
        config.ledger.chain_id = Some(chain_id);
    }
    if let Some(address) = lookup(REGISTRY_ADDRESS_ENV_VAR) {
        config.registry.address = Some(address.trim().to_string());
    }
    Ok(())
}
