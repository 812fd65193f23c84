//! Create the registry program on the ledger.
//!
//! Deployment is not idempotent: every run creates an independent program
//! with empty version history. The guard below refuses to replace a live
//! deployment unless forced.

use std::path::{Path, PathBuf};

use alloy::hex;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use serde::Serialize;
use thiserror::Error;

use crate::ledger::{GasPolicy, LedgerClient, LedgerError};
use crate::registry::REQUIRED_OPERATIONS;
use crate::workflows::state::DeploymentRecord;

/// Inputs of a deployment.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Hex-encoded creation bytecode.
    pub bytecode: PathBuf,
    /// Compiler-emitted interface description, checked before deploying.
    pub abi: Option<PathBuf>,
    /// Where the resulting address is persisted.
    pub address_file: PathBuf,
    /// Replace a live deployment.
    pub force: bool,
}

/// Result of a successful deployment.
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub address: Address,
    pub tx_hash: TxHash,
    pub gas_used: u64,
    /// Address this deployment replaced, if any.
    pub replaced: Option<Address>,
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid bytecode in {path}: {message}")]
    Bytecode { path: PathBuf, message: String },

    #[error("Interface {path} is unusable: {message}")]
    Abi { path: PathBuf, message: String },

    #[error("Registry already deployed at {0}; pass --force to deploy a fresh instance")]
    AlreadyDeployed(Address),
}

impl DeployError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        DeployError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Run the deployment workflow once.
pub async fn deploy(
    client: &LedgerClient,
    request: &DeployRequest,
    policy: &GasPolicy,
) -> Result<DeployOutcome, DeployError> {
    let previous = DeploymentRecord::load(&request.address_file)
        .map_err(|e| DeployError::io(&request.address_file, e))?;

    let replaced = match previous {
        Some(record) => {
            let code = client.code_at(record.address).await?;
            if code.is_empty() {
                tracing::warn!(address = %record.address, "Recorded registry has no code, replacing stale address");
            } else if request.force {
                tracing::warn!(address = %record.address, "Forced redeployment; previous version history is not carried over");
            } else {
                return Err(DeployError::AlreadyDeployed(record.address));
            }
            Some(record.address)
        }
        None => None,
    };

    if let Some(abi) = &request.abi {
        check_abi(abi)?;
    }
    let code = read_bytecode(&request.bytecode)?;

    let call = TransactionRequest::default().with_deploy_code(code);
    let gas_limit = client.gas_limit(&call, policy, "deploy").await?;
    let fees = client.estimate_fee().await;
    let receipt = client.submit(call, fees, gas_limit).await?.ensure_success()?;

    let address = receipt
        .contract_address
        .ok_or(LedgerError::MissingContractAddress(receipt.tx_hash))?;

    DeploymentRecord { address }
        .persist(&request.address_file)
        .map_err(|e| DeployError::io(&request.address_file, e))?;

    tracing::info!(
        address = %address,
        tx_hash = %receipt.tx_hash,
        path = %request.address_file.display(),
        "Registry deployed"
    );

    Ok(DeployOutcome {
        address,
        tx_hash: receipt.tx_hash,
        gas_used: receipt.gas_used,
        replaced,
    })
}

/// Read hex bytecode, tolerating a `0x` prefix and surrounding whitespace.
pub fn read_bytecode(path: &Path) -> Result<Bytes, DeployError> {
    let raw = std::fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
    let code = hex::decode(raw.trim()).map_err(|e| DeployError::Bytecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if code.is_empty() {
        return Err(DeployError::Bytecode {
            path: path.to_path_buf(),
            message: "empty".to_string(),
        });
    }
    Ok(Bytes::from(code))
}

/// Check the interface declares every operation this client calls.
pub fn check_abi(path: &Path) -> Result<(), DeployError> {
    let raw = std::fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
    let abi_error = |message: String| DeployError::Abi {
        path: path.to_path_buf(),
        message,
    };

    let entries: Vec<serde_json::Value> =
        serde_json::from_str(&raw).map_err(|e| abi_error(e.to_string()))?;
    let functions: Vec<&str> = entries
        .iter()
        .filter(|entry| entry.get("type").and_then(|t| t.as_str()) == Some("function"))
        .filter_map(|entry| entry.get("name").and_then(|n| n.as_str()))
        .collect();

    let missing: Vec<&str> = REQUIRED_OPERATIONS
        .iter()
        .copied()
        .filter(|op| !functions.contains(op))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(abi_error(format!("missing functions: {}", missing.join(", "))))
    }
}
