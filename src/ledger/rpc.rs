//! Remote ledger endpoint.
//!
//! # Responsibilities
//! - Define the set of remote operations the ledger client relies on
//! - Connect to JSON-RPC endpoints (primary + failovers)
//! - Apply a per-call timeout and fail over on errors

use std::sync::Arc;
use std::time::Duration;

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use tokio::time::timeout;

use crate::config::LedgerConfig;
use crate::ledger::types::{LedgerError, LedgerResult, Receipt};

/// Operations consumed from the remote ledger endpoint.
#[async_trait]
pub trait LedgerRpc: Send + Sync + 'static {
    /// Chain ID reported by the endpoint.
    async fn chain_id(&self) -> LedgerResult<u64>;

    /// Base fee of the latest block, if the chain reports one.
    async fn base_fee(&self) -> LedgerResult<Option<u128>>;

    /// Simulate a transaction and report its gas consumption.
    async fn estimate_gas(&self, request: &TransactionRequest) -> LedgerResult<u64>;

    /// Transaction count (next nonce) of an account.
    async fn transaction_count(&self, address: Address) -> LedgerResult<u64>;

    /// Execute a non-mutating call.
    async fn call(&self, request: &TransactionRequest) -> LedgerResult<Bytes>;

    /// Submit a signed, EIP-2718 encoded transaction.
    async fn send_raw_transaction(&self, raw: &[u8]) -> LedgerResult<TxHash>;

    /// Whether the endpoint knows a transaction, pending or included.
    async fn transaction_known(&self, tx_hash: TxHash) -> LedgerResult<bool>;

    /// Receipt of a transaction, `None` while it is pending.
    async fn transaction_receipt(&self, tx_hash: TxHash) -> LedgerResult<Option<Receipt>>;

    /// Code deployed at an address (empty when none).
    async fn code_at(&self, address: Address) -> LedgerResult<Bytes>;

    /// Native balance of an account.
    async fn balance(&self, address: Address) -> LedgerResult<U256>;
}

/// JSON-RPC endpoint backed by alloy providers, with failover.
#[derive(Clone)]
pub struct AlloyRpc {
    /// List of providers (primary + failovers).
    providers: Vec<Arc<dyn Provider + Send + Sync>>,
    /// Request timeout duration.
    timeout_duration: Duration,
}

/// Try each provider in order until one answers.
macro_rules! with_failover {
    ($self:ident, $what:literal, |$provider:ident| $call:expr) => {{
        let mut last_error = String::from("no providers configured");
        for (i, $provider) in $self.providers.iter().enumerate() {
            match timeout($self.timeout_duration, $call).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, operation = $what, error = %e, "RPC error");
                    last_error = e.to_string();
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, operation = $what, "RPC timeout");
                    last_error = format!("timeout after {:?}", $self.timeout_duration);
                }
            }
        }
        Err(last_error)
    }};
}

impl AlloyRpc {
    /// Create providers for the configured endpoints.
    pub fn new(config: &LedgerConfig) -> LedgerResult<Self> {
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            LedgerError::Transport(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(
            Arc::new(ProviderBuilder::new().connect_http(primary_url)) as Arc<dyn Provider + Send + Sync>
        );

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(
                    Arc::new(ProviderBuilder::new().connect_http(url)) as Arc<dyn Provider + Send + Sync>
                );
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        Ok(Self {
            providers,
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
        })
    }

    async fn try_chain_id(&self) -> Result<u64, String> {
        with_failover!(self, "chain id", |provider| provider.get_chain_id())
    }

    async fn try_base_fee(&self) -> Result<Option<u128>, String> {
        with_failover!(self, "latest block", |provider| async move {
            provider
                .get_block_by_number(BlockNumberOrTag::Latest)
                .await
                .map(|block| block.and_then(|b| b.header.base_fee_per_gas).map(u128::from))
        })
    }

    async fn try_estimate_gas(&self, request: &TransactionRequest) -> Result<u64, String> {
        with_failover!(self, "gas estimation", |provider| provider.estimate_gas(request.clone()))
    }

    async fn try_transaction_count(&self, address: Address) -> Result<u64, String> {
        with_failover!(self, "transaction count", |provider| provider
            .get_transaction_count(address)
            .pending())
    }

    async fn try_call(&self, request: &TransactionRequest) -> Result<Bytes, String> {
        with_failover!(self, "call", |provider| provider.call(request.clone()))
    }

    async fn try_send_raw(&self, raw: &[u8]) -> Result<TxHash, String> {
        with_failover!(self, "raw submission", |provider| async move {
            provider
                .send_raw_transaction(raw)
                .await
                .map(|pending| *pending.tx_hash())
        })
    }

    async fn try_transaction_known(&self, tx_hash: TxHash) -> Result<bool, String> {
        with_failover!(self, "transaction lookup", |provider| async move {
            provider
                .get_transaction_by_hash(tx_hash)
                .await
                .map(|tx| tx.is_some())
        })
    }

    async fn try_receipt(&self, tx_hash: TxHash) -> Result<Option<Receipt>, String> {
        with_failover!(self, "receipt", |provider| async move {
            provider
                .get_transaction_receipt(tx_hash)
                .await
                .map(|receipt| receipt.map(Receipt::from))
        })
    }

    async fn try_code_at(&self, address: Address) -> Result<Bytes, String> {
        with_failover!(self, "code lookup", |provider| provider.get_code_at(address))
    }

    async fn try_balance(&self, address: Address) -> Result<U256, String> {
        with_failover!(self, "balance", |provider| provider.get_balance(address))
    }
}

#[async_trait]
impl LedgerRpc for AlloyRpc {
    async fn chain_id(&self) -> LedgerResult<u64> {
        self.try_chain_id().await.map_err(LedgerError::Transport)
    }

    async fn base_fee(&self) -> LedgerResult<Option<u128>> {
        self.try_base_fee().await.map_err(LedgerError::Transport)
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> LedgerResult<u64> {
        self.try_estimate_gas(request).await.map_err(LedgerError::Estimation)
    }

    async fn transaction_count(&self, address: Address) -> LedgerResult<u64> {
        self.try_transaction_count(address).await.map_err(LedgerError::Transport)
    }

    async fn call(&self, request: &TransactionRequest) -> LedgerResult<Bytes> {
        self.try_call(request).await.map_err(LedgerError::Transport)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> LedgerResult<TxHash> {
        self.try_send_raw(raw).await.map_err(LedgerError::from_send_error)
    }

    async fn transaction_known(&self, tx_hash: TxHash) -> LedgerResult<bool> {
        self.try_transaction_known(tx_hash).await.map_err(LedgerError::Transport)
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> LedgerResult<Option<Receipt>> {
        self.try_receipt(tx_hash).await.map_err(LedgerError::Transport)
    }

    async fn code_at(&self, address: Address) -> LedgerResult<Bytes> {
        self.try_code_at(address).await.map_err(LedgerError::Transport)
    }

    async fn balance(&self, address: Address) -> LedgerResult<U256> {
        self.try_balance(address).await.map_err(LedgerError::Transport)
    }
}

impl std::fmt::Debug for AlloyRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyRpc")
            .field("providers", &self.providers.len())
            .field("timeout", &self.timeout_duration)
            .finish()
    }
}
