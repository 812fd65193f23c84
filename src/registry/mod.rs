//! Firmware registry program bindings.
//!
//! The on-ledger program exposes four operations; this module encodes calls
//! to them and decodes their results. Storage layout and the rule deciding
//! which versions are acceptable belong to the program itself.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::ledger::{GasPolicy, LedgerClient, LedgerError, LedgerResult, Receipt};

pub mod types;

pub use types::{AckRecord, FirmwareRecord};

sol! {
    /// Interface of the deployed firmware registry program.
    #[sol(all_derives)]
    interface FirmwareRegistry {
        function latestVersion(string deviceType) external view returns (uint256);
        function getLatest(string deviceType) external view returns (uint256 version, string uri, bytes32 sha256);
        function publish(string deviceType, uint256 version, string uri, bytes32 sha256) external;
        function ack(string deviceId, string deviceType, uint256 version, bool success, string info) external;
    }
}

/// Names every deployed artifact must declare for this client to work.
pub const REQUIRED_OPERATIONS: [&str; 4] = ["latestVersion", "getLatest", "publish", "ack"];

/// Handle on a deployed registry program.
#[derive(Debug, Clone)]
pub struct Registry {
    address: Address,
    client: Arc<LedgerClient>,
}

impl Registry {
    pub fn new(address: Address, client: Arc<LedgerClient>) -> Self {
        Self { address, client }
    }

    /// Current version number for a device class; 0 when never published.
    pub async fn latest_version(&self, device_type: &str) -> LedgerResult<u64> {
        let call = FirmwareRegistry::latestVersionCall {
            deviceType: device_type.to_string(),
        };
        let output = self
            .client
            .call(self.address, Bytes::from(call.abi_encode()))
            .await?;
        let version = FirmwareRegistry::latestVersionCall::abi_decode_returns(&output)
            .map_err(|e| LedgerError::Decode(format!("latestVersion: {}", e)))?;
        version_to_u64(version)
    }

    /// Latest record for a device class.
    ///
    /// A never-published class yields [`FirmwareRecord::unpublished`].
    pub async fn get_latest(&self, device_type: &str) -> LedgerResult<FirmwareRecord> {
        let call = FirmwareRegistry::getLatestCall {
            deviceType: device_type.to_string(),
        };
        let output = self
            .client
            .call(self.address, Bytes::from(call.abi_encode()))
            .await?;
        let ret = FirmwareRegistry::getLatestCall::abi_decode_returns(&output)
            .map_err(|e| LedgerError::Decode(format!("getLatest: {}", e)))?;

        Ok(FirmwareRecord {
            version: version_to_u64(ret.version)?,
            uri: ret.uri,
            digest: ret.sha256,
        })
    }

    /// Write a new firmware record for `device_type`.
    pub async fn publish(
        &self,
        device_type: &str,
        record: &FirmwareRecord,
        policy: &GasPolicy,
    ) -> LedgerResult<Receipt> {
        let call = FirmwareRegistry::publishCall {
            deviceType: device_type.to_string(),
            version: U256::from(record.version),
            uri: record.uri.clone(),
            sha256: record.digest,
        };
        self.write(call.abi_encode(), policy, "publish").await
    }

    /// Append a device acknowledgment.
    pub async fn ack(&self, record: &AckRecord, policy: &GasPolicy) -> LedgerResult<Receipt> {
        let call = FirmwareRegistry::ackCall {
            deviceId: record.device_id.clone(),
            deviceType: record.device_type.clone(),
            version: U256::from(record.version),
            success: record.success,
            info: record.info.clone(),
        };
        self.write(call.abi_encode(), policy, "ack").await
    }

    async fn write(
        &self,
        data: Vec<u8>,
        policy: &GasPolicy,
        site: &'static str,
    ) -> LedgerResult<Receipt> {
        let call = TransactionRequest::default()
            .to(self.address)
            .input(Bytes::from(data).into());

        let gas_limit = self.client.gas_limit(&call, policy, site).await?;
        let fees = self.client.estimate_fee().await;
        self.client.submit(call, fees, gas_limit).await
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn client(&self) -> &Arc<LedgerClient> {
        &self.client
    }
}

fn version_to_u64(version: U256) -> LedgerResult<u64> {
    u64::try_from(version)
        .map_err(|_| LedgerError::Decode(format!("version {} does not fit in 64 bits", version)))
}
