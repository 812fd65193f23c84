//! Ledger-facing types and error definitions.

use alloy::primitives::{Address, TxHash};
use serde::Serialize;
use thiserror::Error;

const GWEI: u128 = 1_000_000_000;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// RPC endpoint unreachable or request failed.
    #[error("RPC error: {0}")]
    Transport(String),

    /// The endpoint rejected the transaction's nonce.
    #[error("Nonce conflict: {0}")]
    NonceConflict(String),

    /// The endpoint answered with something we could not interpret.
    #[error("Malformed RPC response: {0}")]
    Decode(String),

    /// Gas simulation failed and the call site has no fallback limit.
    #[error("Gas estimation failed: {0}")]
    Estimation(String),

    /// Transaction was included but execution failed.
    #[error("Transaction {tx_hash} reverted (gas used {gas_used})")]
    Reverted { tx_hash: TxHash, gas_used: u64 },

    /// A creation transaction succeeded without reporting an address.
    #[error("Receipt for {0} carries no contract address")]
    MissingContractAddress(TxHash),

    /// Invalid private key format or missing key.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Transaction could not be built or signed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

impl LedgerError {
    /// Classify an error message returned by the node for a raw submission.
    pub fn from_send_error(message: String) -> Self {
        let lower = message.to_ascii_lowercase();
        let nonce_related = [
            "nonce too low",
            "nonce too high",
            "already known",
            "replacement transaction underpriced",
        ];
        if nonce_related.iter().any(|needle| lower.contains(needle)) {
            LedgerError::NonceConflict(message)
        } else {
            LedgerError::Transport(message)
        }
    }

    /// True for failures of the remote endpoint itself rather than of the
    /// transaction it carried.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            LedgerError::Transport(_) | LedgerError::NonceConflict(_) | LedgerError::Decode(_)
        )
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// EIP-1559 fee bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeEstimate {
    /// Upper bound on total fee per gas.
    pub max_fee_per_gas: u128,
    /// Portion paid to the block producer.
    pub max_priority_fee_per_gas: u128,
}

impl FeeEstimate {
    /// Derive a fee pair from the latest base fee.
    ///
    /// A missing or zero base fee falls back to a fixed cap.
    pub fn from_base_fee(base_fee: Option<u128>, priority_gwei: u64, fallback_cap_gwei: u64) -> Self {
        let priority = priority_gwei as u128 * GWEI;
        let max_fee = match base_fee {
            Some(base) if base > 0 => base.saturating_add(priority),
            _ => fallback_cap_gwei as u128 * GWEI,
        };
        Self {
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: priority,
        }
    }
}

/// Outcome of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    /// True when execution succeeded.
    pub success: bool,
    pub gas_used: u64,
    pub block_number: Option<u64>,
    /// Set for program creation transactions.
    pub contract_address: Option<Address>,
}

impl Receipt {
    /// Turn a failed receipt into [`LedgerError::Reverted`].
    pub fn ensure_success(self) -> LedgerResult<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(LedgerError::Reverted {
                tx_hash: self.tx_hash,
                gas_used: self.gas_used,
            })
        }
    }
}

impl From<alloy::rpc::types::TransactionReceipt> for Receipt {
    fn from(receipt: alloy::rpc::types::TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            success: receipt.status(),
            gas_used: receipt.gas_used,
            block_number: receipt.block_number,
            contract_address: receipt.contract_address,
        }
    }
}
