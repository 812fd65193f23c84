//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key)
//!     → wallet.rs (key loading, signing)
//!     → rpc.rs (remote endpoint, failover, timeouts)
//!     → client.rs (fees, gas, nonce, serialized submission)
//!     → transaction.rs (build, sign, encode, await receipt)
//! ```
//!
//! # Concurrency
//! Every mutation for the signing account passes through
//! [`LedgerClient::submit`], which holds one lock from nonce acquisition to
//! receipt. Reads never take that lock.
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data

pub mod client;
pub mod gas;
pub mod rpc;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::LedgerClient;
pub use gas::GasPolicy;
pub use rpc::{AlloyRpc, LedgerRpc};
pub use types::{FeeEstimate, LedgerError, LedgerResult, Receipt};
pub use wallet::Wallet;
