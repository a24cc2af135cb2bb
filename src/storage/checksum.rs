//! CRC32 checksums for persisted table state
//!
//! Guards the read tail file and every metadata catalog frame. A mismatch on
//! read is reported as TAIL_DATA_CORRUPTION.

use crc32fast::Hasher;

/// Computes a CRC32 (IEEE) checksum over `data`.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Returns whether `data` hashes to `expected`.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}
