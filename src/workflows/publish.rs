//! Publish a new firmware version for a device class.
//!
//! Reads the current version, hashes the artifact, writes `current + 1` and
//! reads the record back. A reverted write is final: it usually means another
//! publisher won the race or the account is not authorized, and either needs
//! a human to look at it.

use std::path::PathBuf;

use alloy::primitives::{TxHash, B256};
use serde::Serialize;
use thiserror::Error;

use crate::ledger::{GasPolicy, LedgerError};
use crate::registry::{FirmwareRecord, Registry};
use crate::workflows::digest::{digest_file, to_hex};

/// What to publish.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub device_type: String,
    pub uri: String,
    /// Local copy of the exact bytes behind `uri`.
    pub artifact: PathBuf,
}

/// Result of a successful publish.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub device_type: String,
    pub previous_version: u64,
    pub record: FirmwareRecord,
    pub tx_hash: TxHash,
    pub gas_used: u64,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Failed to read artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Version {0} is the largest representable; cannot publish a successor")]
    VersionOverflow(u64),

    #[error("Read-after-write mismatch: wrote {expected:?}, ledger reports {observed:?}")]
    VerificationMismatch {
        expected: FirmwareRecord,
        observed: FirmwareRecord,
    },
}

impl PublishError {
    /// True when the transaction was included but failed.
    pub fn is_revert(&self) -> bool {
        matches!(self, PublishError::Ledger(LedgerError::Reverted { .. }))
    }
}

/// Run the publish workflow once.
pub async fn publish(
    registry: &Registry,
    request: &PublishRequest,
    policy: &GasPolicy,
) -> Result<PublishOutcome, PublishError> {
    let device_type = request.device_type.as_str();

    let current = registry.latest_version(device_type).await?;
    let target = current
        .checked_add(1)
        .ok_or(PublishError::VersionOverflow(current))?;
    tracing::info!(device_type, current, target, "Publishing next firmware version");

    let digest: B256 = digest_file(&request.artifact)
        .await
        .map_err(|source| PublishError::Artifact {
            path: request.artifact.clone(),
            source,
        })?;
    tracing::info!(device_type, sha256 = %to_hex(&digest), "Artifact hashed");

    let record = FirmwareRecord {
        version: target,
        uri: request.uri.clone(),
        digest,
    };

    let receipt = registry
        .publish(device_type, &record, policy)
        .await?
        .ensure_success()?;

    let observed = registry.get_latest(device_type).await?;
    if observed != record {
        tracing::error!(device_type, expected = ?record, observed = ?observed, "Latest record differs from the one just written");
        return Err(PublishError::VerificationMismatch {
            expected: record,
            observed,
        });
    }

    tracing::info!(
        device_type,
        version = record.version,
        uri = %record.uri,
        tx_hash = %receipt.tx_hash,
        "Firmware published"
    );

    Ok(PublishOutcome {
        device_type: device_type.to_string(),
        previous_version: current,
        record,
        tx_hash: receipt.tx_hash,
        gas_used: receipt.gas_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_classification() {
        let err = PublishError::from(LedgerError::Reverted {
            tx_hash: TxHash::ZERO,
            gas_used: 30_000,
        });
        assert!(err.is_revert());

        let err = PublishError::from(LedgerError::Transport("connection refused".into()));
        assert!(!err.is_revert());
    }

    #[test]
    fn test_mismatch_message_names_both_records() {
        let expected = FirmwareRecord {
            version: 2,
            uri: "ipfs://a".into(),
            digest: B256::ZERO,
        };
        let observed = FirmwareRecord {
            version: 3,
            ..expected.clone()
        };
        let msg = PublishError::VerificationMismatch { expected, observed }.to_string();
        assert!(msg.contains("version: 2"));
        assert!(msg.contains("version: 3"));
    }
}
