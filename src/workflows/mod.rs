//! Operator workflows run from the command line.
//!
//! # Data Flow
//! ```text
//! deploy:  bytecode + interface → creation tx → receipt → DeploymentRecord
//! publish: DeploymentRecord → latestVersion → digest(artifact)
//!          → publish(current + 1) → receipt → getLatest (read-after-write)
//! ```

pub mod deploy;
pub mod digest;
pub mod publish;
pub mod state;

pub use deploy::{deploy, DeployError, DeployOutcome, DeployRequest};
pub use publish::{publish, PublishError, PublishOutcome, PublishRequest};
pub use state::DeploymentRecord;
