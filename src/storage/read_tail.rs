//! Read tail: the commit cursor of the data log
//!
//! An offset `o` is visible iff `o < tail`. The tail only moves forward and
//! only from an append's own start offset to its end offset, so an append that
//! finishes before a lower offset waits for that offset to commit first. Once
//! an append holds its turn (`tail == offset`) it persists the new value, runs
//! its publish step, and only then stores the tail. Publish steps therefore run
//! one at a time in offset order, and only for appends whose tail was
//! persisted. The advancing store is Release and `get` is Acquire: a reader
//! that sees the new tail also sees the bytes and everything the publish step
//! did. Waiting appenders spin briefly, then yield; readers never wait.
//!
//! If an append fails after reserving its offset the tail is marked failed;
//! every append queued behind it gives up with TAIL_APPEND_STALLED instead of
//! waiting forever.
//!
//! Durable layout of `<data_dir>/read_tail`: tail (u64 LE) followed by its
//! CRC32 (u32 LE).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use super::checksum::{compute_checksum, verify_checksum};
use super::errors::{StorageError, StorageResult};

/// File name of the persisted tail inside a table's data directory
pub const READ_TAIL_FILE: &str = "read_tail";

const TAIL_FILE_LEN: usize = 12;

/// Spins before falling back to `yield_now` while waiting on a lower offset
const SPIN_LIMIT: u32 = 64;

/// Monotonic commit cursor shared by appenders and readers.
#[derive(Debug)]
pub struct ReadTail {
    tail: AtomicU64,
    failed: AtomicBool,
    file: Option<Mutex<File>>,
}

impl ReadTail {
    /// Creates a memory-only tail at zero.
    pub fn in_memory() -> Self {
        Self {
            tail: AtomicU64::new(0),
            failed: AtomicBool::new(false),
            file: None,
        }
    }

    /// Opens or creates `<data_dir>/read_tail`, restoring the persisted value.
    ///
    /// # Errors
    ///
    /// Returns TAIL_DATA_CORRUPTION if the file is truncated or its checksum
    /// does not match.
    pub fn open(data_dir: &Path) -> StorageResult<Self> {
        let path = data_dir.join(READ_TAIL_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                StorageError::io_error(format!("Failed to open read tail: {}", path.display()), e)
            })?;

        let mut buf = Vec::with_capacity(TAIL_FILE_LEN);
        file.read_to_end(&mut buf)
            .map_err(|e| StorageError::read_failed("Failed to load read tail", e))?;

        let tail = match buf.len() {
            0 => 0,
            TAIL_FILE_LEN => {
                let value = &buf[0..8];
                let mut crc = [0u8; 4];
                crc.copy_from_slice(&buf[8..12]);
                if !verify_checksum(value, u32::from_le_bytes(crc)) {
                    return Err(StorageError::data_corruption("Read tail checksum mismatch"));
                }
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(value);
                u64::from_le_bytes(bytes)
            }
            n => {
                return Err(StorageError::data_corruption(format!(
                    "Read tail file has {} bytes, expected {}",
                    n, TAIL_FILE_LEN
                )))
            }
        };

        Ok(Self {
            tail: AtomicU64::new(tail),
            failed: AtomicBool::new(false),
            file: Some(Mutex::new(file)),
        })
    }

    /// Current tail. Every offset below it is committed.
    pub fn get(&self) -> u64 {
        self.tail.load(Ordering::Acquire)
    }

    /// Moves the tail from `offset` to `offset + length`, waiting for every
    /// lower offset to commit first.
    ///
    /// # Errors
    ///
    /// See `advance_with`.
    pub fn advance(&self, offset: u64, length: u64) -> StorageResult<()> {
        self.advance_with(offset, length, || {})
    }

    /// Waits for `tail == offset`, persists `offset + length`, runs
    /// `publish`, then publishes the new tail.
    ///
    /// Only the append that reserved `offset` can observe `tail == offset`,
    /// so once the wait ends no other appender touches the tail until this
    /// one stores the new value. `publish` is not run if the wait or the
    /// persist fails.
    ///
    /// # Errors
    ///
    /// Returns TAIL_APPEND_STALLED if the tail was marked failed while
    /// waiting, or TAIL_STORAGE_WRITE_FAILED if persisting the new value
    /// fails. The tail does not move in either case.
    pub fn advance_with<F>(&self, offset: u64, length: u64, publish: F) -> StorageResult<()>
    where
        F: FnOnce(),
    {
        let end = offset + length;
        if !self.wait_for(offset) {
            return Err(StorageError::append_stalled(offset));
        }

        self.persist(end, offset, length)?;
        publish();
        self.tail.store(end, Ordering::Release);
        Ok(())
    }

    /// Waits until the tail reaches `target`. Returns false if the tail was
    /// marked failed first.
    pub fn wait_for(&self, target: u64) -> bool {
        let mut spins = 0u32;
        while self.tail.load(Ordering::Acquire) < target {
            if self.is_failed() {
                return false;
            }
            if spins < SPIN_LIMIT {
                spins += 1;
                std::hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
        }
        true
    }

    /// Marks the tail failed so queued appends stop waiting.
    pub fn fail(&self) {
        self.failed.store(true, Ordering::Release);
    }

    /// Whether an append failed after reserving its offset.
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    fn persist(&self, value: u64, offset: u64, length: u64) -> StorageResult<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };

        let value = value.to_le_bytes();
        let mut buf = [0u8; TAIL_FILE_LEN];
        buf[0..8].copy_from_slice(&value);
        buf[8..12].copy_from_slice(&compute_checksum(&value).to_le_bytes());

        let mut file = file.lock();
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.write_all(&buf))
            .and_then(|_| file.sync_data())
            .map_err(|e| StorageError::write_failed(offset, length, e))
    }
}
