//! Catalog reader with strict corruption detection
//!
//! Every frame's checksum is verified. A truncated frame, a checksum mismatch
//! or an undecodable payload aborts the read with TAIL_DATA_CORRUPTION.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::storage::{verify_checksum, StorageError, StorageResult};

use super::entry::{CatalogEntry, FRAME_HEADER_SIZE};

/// Sequential reader over a catalog file
pub struct MetadataReader {
    path: PathBuf,
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
}

impl MetadataReader {
    /// Opens the catalog file at `path`.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = File::open(path).map_err(|e| {
            StorageError::read_failed(format!("Failed to open catalog: {}", path.display()), e)
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| StorageError::read_failed("Failed to read catalog metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
        })
    }

    /// Reads every entry of the catalog at `path`. A missing file is an
    /// empty catalog.
    pub fn read_all(path: &Path) -> StorageResult<Vec<CatalogEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = Self::open(path)?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.read_next()? {
            entries.push(entry);
        }
        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the next entry, or `None` at end of file.
    pub fn read_next(&mut self) -> StorageResult<Option<CatalogEntry>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < FRAME_HEADER_SIZE as u64 {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!("Truncated catalog frame header: {} bytes remaining", remaining),
            ));
        }

        let mut header = [0u8; FRAME_HEADER_SIZE];
        self.reader.read_exact(&mut header).map_err(|e| {
            StorageError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read catalog frame header: {}", e),
            )
        })?;

        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&header[0..4]);
        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&header[4..8]);
        let length = u32::from_le_bytes(len_bytes) as u64;
        let checksum = u32::from_le_bytes(crc_bytes);

        if length > remaining - FRAME_HEADER_SIZE as u64 {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Catalog frame length {} exceeds remaining file size {}",
                    length,
                    remaining - FRAME_HEADER_SIZE as u64
                ),
            ));
        }

        let mut payload = vec![0u8; length as usize];
        self.reader.read_exact(&mut payload).map_err(|e| {
            StorageError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read catalog frame: {}", e),
            )
        })?;

        if !verify_checksum(&payload, checksum) {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                "Catalog frame checksum mismatch",
            ));
        }

        let entry = serde_json::from_slice(&payload).map_err(|e| {
            StorageError::corruption_at_offset(
                self.current_offset,
                format!("Undecodable catalog entry: {}", e),
            )
        })?;

        self.current_offset += FRAME_HEADER_SIZE as u64 + length;
        Ok(Some(entry))
    }
}
