//! Artifact content digests.

use std::path::Path;

use alloy::hex;
use alloy::primitives::B256;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 of an in-memory artifact.
pub fn digest_bytes(bytes: &[u8]) -> B256 {
    B256::from_slice(&Sha256::digest(bytes))
}

/// SHA-256 of a file, streamed in fixed-size chunks.
pub async fn digest_file(path: &Path) -> std::io::Result<B256> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(B256::from_slice(&hasher.finalize()))
}

/// `0x`-prefixed lowercase hex, as served to devices.
pub fn to_hex(digest: &B256) -> String {
    hex::encode_prefixed(digest)
}

/// Parse a 32-byte digest from hex, with or without `0x`.
pub fn from_hex(s: &str) -> Result<B256, hex::FromHexError> {
    let bytes = hex::decode(s.trim())?;
    if bytes.len() != 32 {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    Ok(B256::from_slice(&bytes))
}
