//! Persisted deployment state.

use std::io;
use std::path::Path;

use alloy::primitives::Address;

/// Address of the deployed registry program, stored as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub address: Address,
}

impl DeploymentRecord {
    /// Read the record; `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> io::Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let address = content.trim().parse::<Address>().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: invalid address: {}", path.display(), e),
            )
        })?;
        Ok(Some(Self { address }))
    }

    /// Write the record, replacing any previous one atomically.
    pub fn persist(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, format!("{}\n", self.address.to_checksum(None)))?;
        std::fs::rename(&tmp, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployed").join("FirmwareRegistry.address");
        let record = DeploymentRecord {
            address: Address::repeat_byte(0x42),
        };

        record.persist(&path).unwrap();
        assert_eq!(DeploymentRecord::load(&path).unwrap(), Some(record));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(DeploymentRecord::load(&dir.path().join("nope")).unwrap(), None);
    }

    #[test]
    fn test_garbage_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("addr");
        std::fs::write(&path, "not-an-address").unwrap();
        let err = DeploymentRecord::load(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
