//! Firmware ledger: a tamper-evident registry of firmware releases.
//!
//! Operators deploy the registry program and publish versioned firmware
//! records; the gateway serves the latest record to devices and writes their
//! installation acknowledgments back to the ledger.

// Core subsystems
pub mod config;
pub mod ledger;
pub mod registry;
pub mod workflows;

// Device-facing surface
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use http::GatewayServer;
pub use ledger::LedgerClient;
pub use lifecycle::Shutdown;
pub use registry::Registry;
