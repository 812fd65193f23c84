//! Transaction building, signing, and receipt monitoring.
//!
//! # Responsibilities
//! - Build EIP-1559 transactions with explicit nonce, fees and gas limit
//! - Sign and encode them for raw submission
//! - Poll for the receipt until the transaction is included

use std::time::Duration;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use tokio::time::interval;

use crate::ledger::rpc::LedgerRpc;
use crate::ledger::types::{FeeEstimate, LedgerResult, Receipt};
use crate::ledger::wallet::Wallet;

/// A ledger mutation ready to be signed.
///
/// Lives only between nonce acquisition and receipt.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub request: TransactionRequest,
    pub nonce: u64,
    pub fees: FeeEstimate,
    pub gas_limit: u64,
}

impl PendingTransaction {
    /// Populate `call` with everything signing needs.
    pub fn new(
        call: TransactionRequest,
        from: Address,
        chain_id: u64,
        nonce: u64,
        fees: FeeEstimate,
        gas_limit: u64,
    ) -> Self {
        let request = call
            .with_from(from)
            .with_chain_id(chain_id)
            .with_nonce(nonce)
            .with_gas_limit(gas_limit)
            .with_max_fee_per_gas(fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas);

        Self {
            request,
            nonce,
            fees,
            gas_limit,
        }
    }

    /// Sign with the given wallet and encode for submission.
    pub async fn sign(self, wallet: &Wallet) -> LedgerResult<SignedTransaction> {
        let envelope = wallet.sign(self.request).await?;
        let tx_hash = *envelope.tx_hash();
        let raw = Bytes::from(envelope.encoded_2718());

        Ok(SignedTransaction {
            tx_hash,
            nonce: self.nonce,
            raw,
        })
    }
}

/// EIP-2718 encoded, signed transaction.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub tx_hash: TxHash,
    pub nonce: u64,
    pub raw: Bytes,
}

/// Poll the endpoint until a receipt for `tx_hash` shows up.
///
/// There is no deadline; a transaction that never gets included keeps the
/// caller waiting.
pub async fn wait_for_receipt(
    rpc: &dyn LedgerRpc,
    tx_hash: TxHash,
    poll_interval: Duration,
) -> LedgerResult<Receipt> {
    let mut ticker = interval(poll_interval);

    loop {
        ticker.tick().await;

        match rpc.transaction_receipt(tx_hash).await? {
            Some(receipt) => return Ok(receipt),
            None => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
        }
    }
}
