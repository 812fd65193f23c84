//! Signing account management.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized

use alloy::consensus::TxEnvelope;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;

use crate::ledger::types::{LedgerError, LedgerResult};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "FIRMWARE_LEDGER_PRIVATE_KEY";

/// The account every ledger mutation is signed with.
#[derive(Clone)]
pub struct Wallet {
    address: Address,
    inner: EthereumWallet,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// Accepts the key with or without a `0x` prefix.
    pub fn from_private_key(private_key_hex: &str) -> LedgerResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| LedgerError::Wallet(format!("Invalid private key format: {}", e)))?;
        let address = signer.address();

        tracing::info!(address = %address, "Wallet initialized");

        Ok(Self {
            address,
            inner: EthereumWallet::from(signer),
        })
    }

    /// Load wallet from environment variable.
    ///
    /// Reads `FIRMWARE_LEDGER_PRIVATE_KEY` from environment.
    pub fn from_env() -> LedgerResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            LedgerError::Wallet(format!("Environment variable {} not set", PRIVATE_KEY_ENV_VAR))
        })?;

        Self::from_private_key(&private_key)
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a fully populated transaction request.
    pub async fn sign(&self, request: TransactionRequest) -> LedgerResult<TxEnvelope> {
        request
            .build(&self.inner)
            .await
            .map_err(|e| LedgerError::Signing(e.to_string()))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet").field("address", &self.address).finish()
    }
}
