//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Workflows, ledger client and gateway produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape), gateway only
//! ```

pub mod logging;
pub mod metrics;
