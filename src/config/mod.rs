//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! firmware-ledger.toml (optional)
//!     → loader.rs (parse, environment overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → passed by reference to the workflows and the gateway
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - The signing key never lives in the config file; see `ledger::wallet`

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AppConfig, GasConfig, GatewayConfig, LedgerConfig, ObservabilityConfig, RegistryConfig,
};
