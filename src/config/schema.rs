//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure shared by the
//! gateway and the command-line workflows. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::ledger::gas::GasPolicy;

/// Root configuration for the firmware ledger tooling.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Remote ledger endpoint and fee settings.
    pub ledger: LedgerConfig,

    /// Location of the ledger program and its build artifacts.
    pub registry: RegistryConfig,

    /// Gas padding and fallback limits per call site.
    pub gas: GasConfig,

    /// Gateway HTTP listener settings.
    pub gateway: GatewayConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Remote ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Expected chain ID. Read from the endpoint when absent.
    pub chain_id: Option<u64>,

    /// Per-call RPC timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub receipt_poll_interval_ms: u64,

    /// Priority fee (tip) bid in gwei.
    pub priority_fee_gwei: u64,

    /// Fee cap used when the latest block carries no base fee.
    pub fallback_max_fee_gwei: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: None,
            rpc_timeout_secs: 10,
            receipt_poll_interval_ms: 500,
            priority_fee_gwei: 1,
            fallback_max_fee_gwei: 2,
        }
    }
}

/// Ledger program location and deployment artifacts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Explicit program address. Takes precedence over `address_file`.
    pub address: Option<String>,

    /// Plain-text file holding the deployed program address.
    pub address_file: String,

    /// Hex-encoded creation bytecode.
    pub bytecode_file: String,

    /// JSON interface description emitted by the compiler.
    pub abi_file: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            address: None,
            address_file: "deployed/FirmwareRegistry.address".to_string(),
            bytecode_file: "deployed/FirmwareRegistry.bin".to_string(),
            abi_file: "deployed/FirmwareRegistry.abi.json".to_string(),
        }
    }
}

/// Gas policies for each ledger-mutating call site.
///
/// A `[gas.<site>]` table only overrides the fields it names; the rest keep
/// that site's defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(from = "GasConfigFile")]
pub struct GasConfig {
    /// Program creation.
    pub deploy: GasPolicy,

    /// Firmware version publish.
    pub publish: GasPolicy,

    /// Device acknowledgment relayed by the gateway.
    pub ack: GasPolicy,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            deploy: GasPolicy::new(1, 100_000, Some(5_000_000)),
            publish: GasPolicy::new(2, 0, Some(2_000_000)),
            ack: GasPolicy::new(1, 50_000, Some(300_000)),
        }
    }
}

/// `[gas]` as written in the file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GasConfigFile {
    deploy: GasPolicyOverride,
    publish: GasPolicyOverride,
    ack: GasPolicyOverride,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GasPolicyOverride {
    multiplier: Option<u64>,
    cushion: Option<u64>,
    fallback_limit: Option<u64>,
}

impl GasPolicyOverride {
    fn apply(self, base: GasPolicy) -> GasPolicy {
        GasPolicy {
            multiplier: self.multiplier.unwrap_or(base.multiplier),
            cushion: self.cushion.unwrap_or(base.cushion),
            fallback_limit: self.fallback_limit.or(base.fallback_limit),
        }
    }
}

impl From<GasConfigFile> for GasConfig {
    fn from(file: GasConfigFile) -> Self {
        let defaults = GasConfig::default();
        Self {
            deploy: file.deploy.apply(defaults.deploy),
            publish: file.publish.apply(defaults.publish),
            ack: file.ack.apply(defaults.ack),
        }
    }
}

/// Gateway listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address (e.g., "127.0.0.1:5050").
    pub bind_address: String,

    /// Device class used when a request names none.
    pub default_device_type: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5050".to_string(),
            default_device_type: "esp32-s3".to_string(),
            max_body_size: 64 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
