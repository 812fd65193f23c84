//! Ledger client: the single path every ledger mutation goes through.
//!
//! # Responsibilities
//! - Fee estimation with a fixed fallback
//! - Gas estimation, padded per call site
//! - Nonce acquisition, signing, submission and receipt wait, serialized
//!   per signing account
//! - Non-mutating calls (unrestricted concurrency)

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use tokio::sync::Mutex;

use crate::config::LedgerConfig;
use crate::ledger::gas::{GasDecision, GasPolicy};
use crate::ledger::rpc::{AlloyRpc, LedgerRpc};
use crate::ledger::transaction::{wait_for_receipt, PendingTransaction};
use crate::ledger::types::{FeeEstimate, LedgerError, LedgerResult, Receipt};
use crate::ledger::wallet::Wallet;
use crate::observability::metrics;

/// Shared ledger client for one signing account.
pub struct LedgerClient {
    rpc: Arc<dyn LedgerRpc>,
    wallet: Wallet,
    chain_id: u64,
    priority_fee_gwei: u64,
    fallback_max_fee_gwei: u64,
    receipt_poll_interval: Duration,
    /// Held from nonce acquisition until the receipt arrives.
    submission: Mutex<()>,
}

impl LedgerClient {
    /// Connect to the configured endpoints and resolve the chain ID.
    pub async fn connect(config: &LedgerConfig, wallet: Wallet) -> LedgerResult<Self> {
        let rpc = Arc::new(AlloyRpc::new(config)?);
        Self::with_rpc(rpc, wallet, config).await
    }

    /// Build a client over any endpoint implementation.
    ///
    /// When the config names a chain ID it must match the endpoint's.
    pub async fn with_rpc(
        rpc: Arc<dyn LedgerRpc>,
        wallet: Wallet,
        config: &LedgerConfig,
    ) -> LedgerResult<Self> {
        let actual = rpc.chain_id().await?;
        if let Some(expected) = config.chain_id {
            if expected != actual {
                return Err(LedgerError::ChainMismatch { expected, actual });
            }
        }

        tracing::info!(
            chain_id = actual,
            account = %wallet.address(),
            "Ledger client initialized"
        );

        Ok(Self {
            rpc,
            wallet,
            chain_id: actual,
            priority_fee_gwei: config.priority_fee_gwei,
            fallback_max_fee_gwei: config.fallback_max_fee_gwei,
            receipt_poll_interval: Duration::from_millis(config.receipt_poll_interval_ms),
            submission: Mutex::new(()),
        })
    }

    /// Current fee bid. Always produces a usable pair.
    pub async fn estimate_fee(&self) -> FeeEstimate {
        let base_fee = match self.rpc.base_fee().await {
            Ok(base_fee) => base_fee,
            Err(e) => {
                tracing::warn!(error = %e, "Base fee unavailable, using fallback fee cap");
                None
            }
        };
        FeeEstimate::from_base_fee(base_fee, self.priority_fee_gwei, self.fallback_max_fee_gwei)
    }

    /// Raw gas estimate for a call sent from the signing account.
    pub async fn estimate_gas(&self, call: &TransactionRequest) -> LedgerResult<u64> {
        let call = call.clone().from(self.wallet.address());
        self.rpc.estimate_gas(&call).await
    }

    /// Gas limit for a call site, falling back per its policy.
    pub async fn gas_limit(
        &self,
        call: &TransactionRequest,
        policy: &GasPolicy,
        site: &'static str,
    ) -> LedgerResult<u64> {
        let decision = policy.resolve(self.estimate_gas(call).await)?;
        match &decision {
            GasDecision::Estimated { estimate, limit } => {
                tracing::debug!(site, estimate, gas_limit = limit, "Gas estimated");
            }
            GasDecision::Fallback { limit, reason } => {
                tracing::warn!(site, error = %reason, gas_limit = limit, "Gas estimation failed, using fallback limit");
                metrics::record_gas_fallback(site);
            }
        }
        Ok(decision.limit())
    }

    /// Next nonce of the signing account.
    pub async fn next_nonce(&self) -> LedgerResult<u64> {
        self.rpc.transaction_count(self.wallet.address()).await
    }

    /// Sign, submit and wait for the receipt of a ledger mutation.
    ///
    /// Returns the receipt whatever its status; use
    /// [`Receipt::ensure_success`] to treat reverts as errors.
    pub async fn submit(
        &self,
        call: TransactionRequest,
        fees: FeeEstimate,
        gas_limit: u64,
    ) -> LedgerResult<Receipt> {
        let started = Instant::now();
        let _guard = self.submission.lock().await;

        let result = self.submit_locked(call, fees, gas_limit).await;
        match &result {
            Ok(receipt) if receipt.success => {
                tracing::info!(tx_hash = %receipt.tx_hash, gas_used = receipt.gas_used, block = ?receipt.block_number, "Transaction confirmed");
            }
            Ok(receipt) => {
                tracing::error!(tx_hash = %receipt.tx_hash, gas_used = receipt.gas_used, "Transaction reverted");
            }
            Err(e) => tracing::error!(error = %e, "Transaction submission failed"),
        }
        metrics::record_submission(submission_outcome(&result), started);
        result
    }

    async fn submit_locked(
        &self,
        call: TransactionRequest,
        fees: FeeEstimate,
        gas_limit: u64,
    ) -> LedgerResult<Receipt> {
        let nonce = self.next_nonce().await?;
        let signed = PendingTransaction::new(
            call,
            self.wallet.address(),
            self.chain_id,
            nonce,
            fees,
            gas_limit,
        )
        .sign(&self.wallet)
        .await?;

        match self.rpc.send_raw_transaction(&signed.raw).await {
            Ok(tx_hash) if tx_hash != signed.tx_hash => {
                tracing::warn!(expected = %signed.tx_hash, reported = %tx_hash, "Endpoint reported a different transaction hash");
            }
            Ok(_) => {}
            // A timed-out send can still have reached a node; a retry on the
            // next endpoint then reports it as known or its nonce as used.
            Err(e) => match self.rpc.transaction_known(signed.tx_hash).await {
                Ok(true) => {
                    tracing::warn!(tx_hash = %signed.tx_hash, error = %e, "Submission reported an error but the transaction is known, awaiting receipt");
                }
                Ok(false) => return Err(e),
                Err(lookup) => {
                    tracing::warn!(tx_hash = %signed.tx_hash, error = %lookup, "Could not look up transaction after failed submission");
                    return Err(e);
                }
            },
        }

        tracing::info!(
            tx_hash = %signed.tx_hash,
            nonce,
            gas_limit,
            max_fee_per_gas = fees.max_fee_per_gas,
            "Transaction submitted"
        );

        wait_for_receipt(self.rpc.as_ref(), signed.tx_hash, self.receipt_poll_interval).await
    }

    /// Execute a non-mutating call against `to`.
    pub async fn call(&self, to: Address, data: Bytes) -> LedgerResult<Bytes> {
        let request = TransactionRequest::default()
            .from(self.wallet.address())
            .to(to)
            .input(data.into());
        self.rpc.call(&request).await
    }

    /// Code deployed at `address`.
    pub async fn code_at(&self, address: Address) -> LedgerResult<Bytes> {
        self.rpc.code_at(address).await
    }

    /// Native balance of the signing account.
    pub async fn balance(&self) -> LedgerResult<U256> {
        self.rpc.balance(self.wallet.address()).await
    }

    /// Check the endpoint still answers for our chain.
    pub async fn is_healthy(&self) -> bool {
        matches!(self.rpc.chain_id().await, Ok(id) if id == self.chain_id)
    }

    /// The signing account.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

/// Label for `ledger_submissions_total`.
pub fn submission_outcome(result: &LedgerResult<Receipt>) -> &'static str {
    match result {
        Ok(receipt) if receipt.success => "success",
        Ok(_) => "reverted",
        Err(LedgerError::NonceConflict(_)) => "rejected",
        Err(_) => "failed",
    }
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("account", &self.wallet.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::TxHash;

    fn receipt(success: bool) -> Receipt {
        Receipt {
            tx_hash: TxHash::repeat_byte(0x01),
            success,
            gas_used: 21_000,
            block_number: Some(1),
            contract_address: None,
        }
    }

    #[test]
    fn test_every_submission_result_has_an_outcome() {
        assert_eq!(submission_outcome(&Ok(receipt(true))), "success");
        assert_eq!(submission_outcome(&Ok(receipt(false))), "reverted");
        assert_eq!(
            submission_outcome(&Err(LedgerError::NonceConflict("nonce too low".into()))),
            "rejected"
        );
        assert_eq!(
            submission_outcome(&Err(LedgerError::Transport("connection refused".into()))),
            "failed"
        );
        assert_eq!(
            submission_outcome(&Err(LedgerError::Signing("missing field".into()))),
            "failed"
        );
    }
}
