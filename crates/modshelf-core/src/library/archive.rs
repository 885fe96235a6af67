//! Archive container detection from magic bytes.

use async_trait::async_trait;
use std::io::Read;
use std::path::Path;

use super::traits::ArchiveService;
use super::types::ArchiveType;
use crate::error::{MigrationError, Result};

/// Magic bytes for container detection.
mod magic {
    pub const ZIP: &[u8; 4] = &[0x50, 0x4B, 0x03, 0x04];
    pub const ZIP_EMPTY: &[u8; 4] = &[0x50, 0x4B, 0x05, 0x06];
    pub const SEVEN_ZIP: &[u8; 6] = &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];
    pub const RAR: &[u8; 6] = b"Rar!\x1A\x07";
    pub const GZIP: &[u8; 2] = &[0x1F, 0x8B];
    /// `ustar` lives at offset 257 of the first tar header
    pub const TAR: &[u8; 5] = b"ustar";
    pub const TAR_OFFSET: usize = 257;
}

/// Bytes read from the start of an archive for sniffing.
const HEADER_LEN: usize = 512;

/// Sniff the container format of `header`.
pub fn detect_from_header(header: &[u8]) -> ArchiveType {
    if header.starts_with(magic::ZIP) || header.starts_with(magic::ZIP_EMPTY) {
        return ArchiveType::Zip;
    }
    if header.starts_with(magic::SEVEN_ZIP) {
        return ArchiveType::SevenZip;
    }
    if header.starts_with(magic::RAR) {
        return ArchiveType::Rar;
    }
    if header.starts_with(magic::GZIP) {
        return ArchiveType::Gzip;
    }
    if header.len() >= magic::TAR_OFFSET + magic::TAR.len()
        && &header[magic::TAR_OFFSET..magic::TAR_OFFSET + magic::TAR.len()] == magic::TAR
    {
        return ArchiveType::Tar;
    }
    ArchiveType::Unknown
}

/// [`ArchiveService`] that identifies archives by content sniffing.
#[derive(Debug, Default, Clone)]
pub struct MagicArchiveService;

impl MagicArchiveService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArchiveService for MagicArchiveService {
    async fn detect_archive_type(&self, path: &Path) -> Result<ArchiveType> {
        let mut file =
            std::fs::File::open(path).map_err(|e| MigrationError::io_with_path(e, path))?;
        let mut header = Vec::with_capacity(HEADER_LEN);
        file.by_ref()
            .take(HEADER_LEN as u64)
            .read_to_end(&mut header)
            .map_err(|e| MigrationError::io_with_path(e, path))?;
        Ok(detect_from_header(&header))
    }
}
