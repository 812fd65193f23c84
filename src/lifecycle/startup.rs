//! Startup orchestration.
//!
//! Builds the one connection/key/program triple a process works with and
//! hands it out explicitly; nothing here is global.

use std::path::Path;
use std::sync::Arc;

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::{AppConfig, RegistryConfig};
use crate::ledger::{LedgerClient, LedgerError, Wallet};
use crate::registry::Registry;
use crate::workflows::DeploymentRecord;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Registry address unknown: set registry.address or deploy first ({0})")]
    NotDeployed(String),

    #[error("Invalid registry address: {0}")]
    InvalidAddress(String),

    #[error("Failed to read {path}: {source}")]
    AddressFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Load the signing key and connect to the ledger.
pub async fn connect(config: &AppConfig) -> Result<Arc<LedgerClient>, StartupError> {
    let wallet = Wallet::from_env()?;
    let client = LedgerClient::connect(&config.ledger, wallet).await?;

    match client.balance().await {
        Ok(balance) => tracing::info!(account = %client.address(), balance_wei = %balance, "Signing account ready"),
        Err(e) => tracing::warn!(account = %client.address(), error = %e, "Could not read account balance"),
    }

    Ok(Arc::new(client))
}

/// Locate the deployed registry program.
///
/// An explicit address wins over the deployment record.
pub fn registry_address(config: &RegistryConfig) -> Result<Address, StartupError> {
    if let Some(raw) = &config.address {
        return raw
            .parse()
            .map_err(|_| StartupError::InvalidAddress(raw.clone()));
    }

    let path = Path::new(&config.address_file);
    match DeploymentRecord::load(path) {
        Ok(Some(record)) => Ok(record.address),
        Ok(None) => Err(StartupError::NotDeployed(config.address_file.clone())),
        Err(source) => Err(StartupError::AddressFile {
            path: config.address_file.clone(),
            source,
        }),
    }
}

/// Connect and open the registry in one step.
pub async fn open_registry(config: &AppConfig) -> Result<Registry, StartupError> {
    let address = registry_address(&config.registry)?;
    let client = connect(config).await?;
    tracing::info!(registry = %address, "Registry located");
    Ok(Registry::new(address, client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_address_wins() {
        let config = RegistryConfig {
            address: Some("0x5fbdb2315678afecb367f032d93f642f64180aa3".to_string()),
            address_file: "/nonexistent".to_string(),
            ..RegistryConfig::default()
        };
        let address = registry_address(&config).unwrap();
        assert_eq!(
            address.to_string().to_lowercase(),
            "0x5fbdb2315678afecb367f032d93f642f64180aa3"
        );
    }

    #[test]
    fn test_address_from_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("FirmwareRegistry.address");
        let record = DeploymentRecord {
            address: Address::repeat_byte(0x07),
        };
        record.persist(&path).unwrap();

        let config = RegistryConfig {
            address_file: path.to_string_lossy().into_owned(),
            ..RegistryConfig::default()
        };
        assert_eq!(registry_address(&config).unwrap(), record.address);
    }

    #[test]
    fn test_not_deployed() {
        let config = RegistryConfig {
            address_file: "/nonexistent/FirmwareRegistry.address".to_string(),
            ..RegistryConfig::default()
        };
        assert!(matches!(
            registry_address(&config),
            Err(StartupError::NotDeployed(_))
        ));
    }
}
