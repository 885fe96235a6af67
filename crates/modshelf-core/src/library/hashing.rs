//! Archive fingerprints and destination mod identifiers.
//!
//! The destination library keys mods by its own content hash rather than the
//! legacy identifier, so the same archive always maps to the same record.

use blake3::Hasher as Blake3Hasher;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::error::{MigrationError, Result};

/// Chunk size for reading archives (8MB).
const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Length of a destination mod id in hex characters.
const MOD_ID_LEN: usize = 16;

/// SHA-256 and BLAKE3 digests of one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFingerprint {
    /// SHA256 hash as lowercase hex string
    pub sha256: String,
    /// BLAKE3 hash as lowercase hex string
    pub blake3: String,
}

impl ArchiveFingerprint {
    /// Destination mod id: a BLAKE3 prefix.
    pub fn mod_id(&self) -> String {
        self.blake3[..MOD_ID_LEN].to_string()
    }
}

/// Compute both digests of `path` in a single pass.
pub fn fingerprint_archive(path: impl AsRef<Path>) -> Result<ArchiveFingerprint> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| MigrationError::io_with_path(e, path))?;

    let mut sha256_hasher = Sha256::new();
    let mut blake3_hasher = Blake3Hasher::new();

    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| MigrationError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        sha256_hasher.update(&buffer[..bytes_read]);
        blake3_hasher.update(&buffer[..bytes_read]);
    }

    Ok(ArchiveFingerprint {
        sha256: hex::encode(sha256_hasher.finalize()),
        blake3: blake3_hasher.finalize().to_hex().to_string(),
    })
}

/// Fingerprint `path` on the blocking pool.
pub async fn fingerprint_archive_async(path: &Path) -> Result<ArchiveFingerprint> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || fingerprint_archive(&path))
        .await
        .map_err(|e| MigrationError::Other(format!("Hashing task failed: {}", e)))?
}
