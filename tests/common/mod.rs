//! Shared utilities for integration testing.
//!
//! `MemoryLedger` stands in for a JSON-RPC endpoint: it accepts real signed
//! transactions, enforces nonces for the test account and executes the four
//! registry operations.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{Address, Bytes, TxHash, TxKind, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{SolInterface, SolValue};
use async_trait::async_trait;
use tokio::net::TcpListener;

use firmware_ledger::config::{GasConfig, GatewayConfig, LedgerConfig};
use firmware_ledger::http::GatewayServer;
use firmware_ledger::ledger::{LedgerClient, LedgerError, LedgerResult, LedgerRpc, Receipt, Wallet};
use firmware_ledger::lifecycle::Shutdown;
use firmware_ledger::registry::FirmwareRegistry::FirmwareRegistryCalls;
use firmware_ledger::registry::{AckRecord, FirmwareRecord, Registry};
use firmware_ledger::workflows::{self, DeployRequest};

/// First Anvil development key.
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_CHAIN_ID: u64 = 31337;
/// Placeholder creation code; the memory ledger does not execute it.
pub const TEST_BYTECODE: &str = "0x6080604052348015600f57600080fd5b50";

const CALL_GAS: u64 = 60_000;
const CREATE_GAS: u64 = 450_000;

/// A transaction accepted by the memory ledger.
#[derive(Debug, Clone)]
pub struct SubmittedTx {
    pub tx_hash: TxHash,
    pub nonce: u64,
    pub gas_limit: u64,
    pub create: bool,
}

#[derive(Default)]
struct RegistryState {
    latest: HashMap<String, FirmwareRecord>,
    acks: Vec<AckRecord>,
}

#[derive(Default)]
struct LedgerState {
    nonce: u64,
    block: u64,
    code: HashMap<Address, Bytes>,
    registries: HashMap<Address, RegistryState>,
    receipts: HashMap<TxHash, Receipt>,
    /// Receipt polls left before a receipt becomes visible.
    pending_polls: HashMap<TxHash, u32>,
    submitted: Vec<SubmittedTx>,
}

/// In-process ledger endpoint for one signing account.
pub struct MemoryLedger {
    account: Address,
    state: Mutex<LedgerState>,
    fail_estimates: AtomicBool,
    reject_publishes: AtomicBool,
    reject_acks: AtomicBool,
    corrupt_reads: AtomicBool,
    lose_send_responses: AtomicBool,
    drop_sends: AtomicBool,
    online: AtomicBool,
    nonce_latency_ms: AtomicU64,
}

impl MemoryLedger {
    pub fn new(account: Address) -> Self {
        Self {
            account,
            state: Mutex::new(LedgerState::default()),
            fail_estimates: AtomicBool::new(false),
            reject_publishes: AtomicBool::new(false),
            reject_acks: AtomicBool::new(false),
            corrupt_reads: AtomicBool::new(false),
            lose_send_responses: AtomicBool::new(false),
            drop_sends: AtomicBool::new(false),
            online: AtomicBool::new(true),
            nonce_latency_ms: AtomicU64::new(0),
        }
    }

    /// Make every gas estimate fail.
    pub fn fail_estimates(&self, fail: bool) {
        self.fail_estimates.store(fail, Ordering::SeqCst);
    }

    /// Revert every publish, as for an unauthorized publisher.
    pub fn reject_publishes(&self, reject: bool) {
        self.reject_publishes.store(reject, Ordering::SeqCst);
    }

    /// Revert every acknowledgment.
    pub fn reject_acks(&self, reject: bool) {
        self.reject_acks.store(reject, Ordering::SeqCst);
    }

    /// Make `getLatest` report a uri other than the stored one.
    pub fn corrupt_reads(&self, corrupt: bool) {
        self.corrupt_reads.store(corrupt, Ordering::SeqCst);
    }

    /// Accept submissions but answer them with a timeout, as when the
    /// response is lost on the way back.
    pub fn lose_send_responses(&self, lose: bool) {
        self.lose_send_responses.store(lose, Ordering::SeqCst);
    }

    /// Answer submissions with a timeout without accepting them.
    pub fn drop_sends(&self, drop: bool) {
        self.drop_sends.store(drop, Ordering::SeqCst);
    }

    /// Take the endpoint down or bring it back.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Delay nonce lookups, widening any window between nonce read and use.
    pub fn set_nonce_latency(&self, latency: Duration) {
        self.nonce_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Forget the code at an address, as after a chain reset.
    pub fn wipe_code(&self, address: Address) {
        let mut state = self.state.lock().unwrap();
        state.code.remove(&address);
        state.registries.remove(&address);
    }

    pub fn submitted(&self) -> Vec<SubmittedTx> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn acks(&self, registry: Address) -> Vec<AckRecord> {
        self.state
            .lock()
            .unwrap()
            .registries
            .get(&registry)
            .map(|r| r.acks.clone())
            .unwrap_or_default()
    }

    fn next_nonce(&self, address: Address) -> u64 {
        if address == self.account {
            self.state.lock().unwrap().nonce
        } else {
            0
        }
    }

    fn ensure_online(&self) -> LedgerResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Transport("connection refused".into()))
        }
    }

    fn execute(&self, state: &mut LedgerState, to: Address, input: &[u8]) -> bool {
        let reject_publishes = self.reject_publishes.load(Ordering::SeqCst);
        let reject_acks = self.reject_acks.load(Ordering::SeqCst);
        let Some(registry) = state.registries.get_mut(&to) else {
            return true;
        };
        match FirmwareRegistryCalls::abi_decode(input) {
            Ok(FirmwareRegistryCalls::publish(call)) => {
                let current = registry
                    .latest
                    .get(&call.deviceType)
                    .map(|r| r.version)
                    .unwrap_or(0);
                if reject_publishes || call.version != U256::from(current + 1) {
                    return false;
                }
                registry.latest.insert(
                    call.deviceType,
                    FirmwareRecord {
                        version: current + 1,
                        uri: call.uri,
                        digest: call.sha256,
                    },
                );
                true
            }
            Ok(FirmwareRegistryCalls::ack(call)) => {
                if reject_acks {
                    return false;
                }
                registry.acks.push(AckRecord {
                    device_id: call.deviceId,
                    device_type: call.deviceType,
                    version: call.version.to::<u64>(),
                    success: call.success,
                    info: call.info,
                });
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl LedgerRpc for MemoryLedger {
    async fn chain_id(&self) -> LedgerResult<u64> {
        self.ensure_online()?;
        Ok(TEST_CHAIN_ID)
    }

    async fn base_fee(&self) -> LedgerResult<Option<u128>> {
        self.ensure_online()?;
        Ok(Some(1_000_000_000))
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> LedgerResult<u64> {
        self.ensure_online()?;
        if self.fail_estimates.load(Ordering::SeqCst) {
            return Err(LedgerError::Estimation("execution reverted".into()));
        }
        match request.to {
            Some(TxKind::Call(_)) => Ok(CALL_GAS),
            _ => Ok(CREATE_GAS),
        }
    }

    async fn transaction_count(&self, address: Address) -> LedgerResult<u64> {
        self.ensure_online()?;
        let nonce = self.next_nonce(address);
        let latency = self.nonce_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        Ok(nonce)
    }

    async fn call(&self, request: &TransactionRequest) -> LedgerResult<Bytes> {
        self.ensure_online()?;
        let Some(TxKind::Call(to)) = request.to else {
            return Err(LedgerError::Transport("call without target".into()));
        };
        let input = request.input.input().cloned().unwrap_or_default();

        let state = self.state.lock().unwrap();
        let Some(registry) = state.registries.get(&to) else {
            return Ok(Bytes::new());
        };
        let unpublished = FirmwareRecord::unpublished();
        let output = match FirmwareRegistryCalls::abi_decode(&input) {
            Ok(FirmwareRegistryCalls::latestVersion(call)) => {
                let record = registry.latest.get(&call.deviceType).unwrap_or(&unpublished);
                U256::from(record.version).abi_encode()
            }
            Ok(FirmwareRegistryCalls::getLatest(call)) => {
                let record = registry.latest.get(&call.deviceType).unwrap_or(&unpublished);
                let uri = if self.corrupt_reads.load(Ordering::SeqCst) {
                    format!("{}#tampered", record.uri)
                } else {
                    record.uri.clone()
                };
                (U256::from(record.version), uri, record.digest).abi_encode_params()
            }
            _ => return Err(LedgerError::Transport("execution reverted".into())),
        };
        Ok(Bytes::from(output))
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> LedgerResult<TxHash> {
        self.ensure_online()?;
        if self.drop_sends.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("timeout after 10s".into()));
        }
        let envelope = TxEnvelope::decode_2718(&mut &raw[..])
            .map_err(|e| LedgerError::Transport(format!("invalid transaction: {}", e)))?;

        let mut state = self.state.lock().unwrap();
        if envelope.nonce() != state.nonce {
            return Err(LedgerError::from_send_error(format!(
                "nonce too low: next nonce {}, tx nonce {}",
                state.nonce,
                envelope.nonce()
            )));
        }

        let tx_hash = *envelope.tx_hash();
        let nonce = state.nonce;
        let gas_limit = envelope.gas_limit();
        state.nonce += 1;
        state.block += 1;

        let (success, contract_address, gas_used) = match envelope.kind() {
            TxKind::Create => {
                let address = self.account.create(nonce);
                state.code.insert(address, envelope.input().clone());
                state.registries.insert(address, RegistryState::default());
                (CREATE_GAS <= gas_limit, Some(address), CREATE_GAS.min(gas_limit))
            }
            TxKind::Call(to) => {
                let ok = CALL_GAS <= gas_limit && self.execute(&mut state, to, envelope.input());
                (ok, None, CALL_GAS.min(gas_limit))
            }
        };

        let receipt = Receipt {
            tx_hash,
            success,
            gas_used,
            block_number: Some(state.block),
            contract_address: contract_address.filter(|_| success),
        };
        state.receipts.insert(tx_hash, receipt);
        state.pending_polls.insert(tx_hash, 1);
        state.submitted.push(SubmittedTx {
            tx_hash,
            nonce,
            gas_limit,
            create: contract_address.is_some(),
        });
        if self.lose_send_responses.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("timeout after 10s".into()));
        }
        Ok(tx_hash)
    }

    async fn transaction_known(&self, tx_hash: TxHash) -> LedgerResult<bool> {
        self.ensure_online()?;
        Ok(self.state.lock().unwrap().receipts.contains_key(&tx_hash))
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> LedgerResult<Option<Receipt>> {
        self.ensure_online()?;
        let mut state = self.state.lock().unwrap();
        if let Some(polls) = state.pending_polls.get_mut(&tx_hash) {
            if *polls > 0 {
                *polls -= 1;
                return Ok(None);
            }
        }
        Ok(state.receipts.get(&tx_hash).cloned())
    }

    async fn code_at(&self, address: Address) -> LedgerResult<Bytes> {
        self.ensure_online()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .code
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn balance(&self, _address: Address) -> LedgerResult<U256> {
        self.ensure_online()?;
        Ok(U256::from(10u64).pow(U256::from(18u64)))
    }
}

pub fn test_wallet() -> Wallet {
    Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap()
}

pub fn ledger_config() -> LedgerConfig {
    LedgerConfig {
        chain_id: Some(TEST_CHAIN_ID),
        receipt_poll_interval_ms: 5,
        ..LedgerConfig::default()
    }
}

/// A memory ledger plus a client signing for its account.
pub async fn setup() -> (Arc<MemoryLedger>, Arc<LedgerClient>) {
    let wallet = test_wallet();
    let ledger = Arc::new(MemoryLedger::new(wallet.address()));
    let client = LedgerClient::with_rpc(ledger.clone(), wallet, &ledger_config())
        .await
        .unwrap();
    (ledger, Arc::new(client))
}

/// Write the creation bytecode and return a deploy request for `dir`.
pub fn deploy_request(dir: &Path) -> DeployRequest {
    let bytecode = dir.join("FirmwareRegistry.bin");
    std::fs::write(&bytecode, TEST_BYTECODE).unwrap();
    DeployRequest {
        bytecode,
        abi: None,
        address_file: dir.join("FirmwareRegistry.address"),
        force: false,
    }
}

/// Deploy a fresh registry through the deploy workflow.
pub async fn deploy_registry(client: &Arc<LedgerClient>, dir: &Path) -> Registry {
    let outcome = workflows::deploy(client, &deploy_request(dir), &GasConfig::default().deploy)
        .await
        .unwrap();
    Registry::new(outcome.address, client.clone())
}

/// Write an artifact file and return its path.
pub fn write_artifact(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Start a gateway on an ephemeral port.
pub async fn spawn_gateway(registry: Registry) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = GatewayServer::new(
        &GatewayConfig::default(),
        Arc::new(registry),
        GasConfig::default().ack,
    );
    tokio::spawn(server.run(listener, shutdown.subscribe()));
    (addr, shutdown)
}

pub fn digest_of(contents: &[u8]) -> B256 {
    firmware_ledger::workflows::digest::digest_bytes(contents)
}
