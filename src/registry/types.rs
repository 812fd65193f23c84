//! Records stored by the registry program.

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

/// Latest firmware for one device class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareRecord {
    /// Strictly increasing; 0 means nothing has been published.
    pub version: u64,
    /// Artifact locator (e.g. `ipfs://<cid>`).
    pub uri: String,
    /// SHA-256 of the artifact bytes.
    pub digest: B256,
}

impl FirmwareRecord {
    /// What the program reports for a class that was never published.
    pub fn unpublished() -> Self {
        Self {
            version: 0,
            uri: String::new(),
            digest: B256::ZERO,
        }
    }

    pub fn is_unpublished(&self) -> bool {
        self.version == 0
    }
}

/// One device's report of an installation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckRecord {
    pub device_id: String,
    pub device_type: String,
    pub version: u64,
    pub success: bool,
    /// Free-text diagnostic.
    pub info: String,
}
