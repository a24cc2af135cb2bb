//! Append-only byte log
//!
//! Every append receives the byte range `[offset, offset + len)` where
//! `offset` is the log length before the append. Offsets are allocated with a
//! compare-and-swap on the length counter, so concurrent appenders never share
//! or skip a byte and no lock is taken to reserve space.
//!
//! Bytes live in lazily allocated 1 MiB segments of atomic cells. Writers only
//! touch their own reserved range; readers only look below the read tail,
//! whose Release/Acquire pairing publishes the bytes.
//!
//! In durable mode `flush` writes the range to `<data_dir>/data_log` and syncs
//! it before returning. Flushes may land in any order; recovery truncates the
//! file back to the persisted tail.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;

use super::errors::{StorageError, StorageResult};

/// Bytes per in-memory segment
pub const SEGMENT_SIZE: usize = 1 << 20;

/// File name of the persisted log inside a table's data directory
pub const DATA_LOG_FILE: &str = "data_log";

type Segment = Box<[AtomicU8]>;

/// Append-only byte log with CAS offset allocation.
pub struct DataLog {
    segments: Box<[OnceLock<Segment>]>,
    length: AtomicU64,
    capacity: u64,
    file: Option<Mutex<File>>,
    path: Option<PathBuf>,
}

impl DataLog {
    /// Creates a memory-only log holding at most `capacity` bytes.
    pub fn in_memory(capacity: u64) -> Self {
        let segment_count = capacity.div_ceil(SEGMENT_SIZE as u64) as usize;
        let segments = (0..segment_count)
            .map(|_| OnceLock::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            segments,
            length: AtomicU64::new(0),
            capacity,
            file: None,
            path: None,
        }
    }

    /// Opens or creates `<data_dir>/data_log` and loads its contents.
    ///
    /// # Errors
    ///
    /// Returns TAIL_STORAGE_IO_ERROR if the file cannot be opened or read, and
    /// TAIL_DATA_CORRUPTION if it is larger than `capacity`.
    pub fn open(data_dir: &Path, capacity: u64) -> StorageResult<Self> {
        if !data_dir.exists() {
            fs::create_dir_all(data_dir).map_err(|e| {
                StorageError::io_error(
                    format!("Failed to create data directory: {}", data_dir.display()),
                    e,
                )
            })?;
        }

        let path = data_dir.join(DATA_LOG_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                StorageError::io_error(format!("Failed to open data log: {}", path.display()), e)
            })?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| StorageError::read_failed("Failed to load data log", e))?;

        if contents.len() as u64 > capacity {
            return Err(StorageError::data_corruption(format!(
                "Data log holds {} bytes, capacity is {}",
                contents.len(),
                capacity
            )));
        }

        let mut log = Self::in_memory(capacity);
        log.write_at(0, &contents);
        log.length = AtomicU64::new(contents.len() as u64);
        log.file = Some(Mutex::new(file));
        log.path = Some(path);
        Ok(log)
    }

    /// Drops every byte at or beyond `length`. Only used while opening a table.
    pub fn truncate(&mut self, length: u64) -> StorageResult<()> {
        if length >= self.len() {
            return Ok(());
        }
        if let Some(file) = &self.file {
            file.lock()
                .set_len(length)
                .map_err(|e| StorageError::io_error("Failed to truncate data log", e))?;
        }
        self.length.store(length, Ordering::Release);
        Ok(())
    }

    /// Reserves space for `bytes`, copies them in, and returns their offset.
    ///
    /// # Errors
    ///
    /// Returns TAIL_LOG_FULL if the payload does not fit. No offset is
    /// consumed in that case.
    pub fn append(&self, bytes: &[u8]) -> StorageResult<u64> {
        let requested = bytes.len() as u64;
        let mut current = self.length.load(Ordering::Relaxed);

        let offset = loop {
            let end = match current.checked_add(requested) {
                Some(end) if end <= self.capacity => end,
                _ => return Err(StorageError::log_full(current, requested, self.capacity)),
            };
            match self.length.compare_exchange_weak(
                current,
                end,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break current,
                Err(observed) => current = observed,
            }
        };

        self.write_at(offset, bytes);
        Ok(offset)
    }

    /// Makes `[offset, offset + length)` durable. No-op in memory mode.
    ///
    /// # Errors
    ///
    /// Returns TAIL_STORAGE_WRITE_FAILED (FATAL) if the write or sync fails.
    pub fn flush(&self, offset: u64, length: u64) -> StorageResult<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };

        let bytes = self.slice(offset, length as usize);
        let mut file = file.lock();
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| StorageError::write_failed(offset, length, e))?;
        file.write_all(&bytes)
            .map_err(|e| StorageError::write_failed(offset, length, e))?;
        file.sync_data()
            .map_err(|e| StorageError::write_failed(offset, length, e))?;
        Ok(())
    }

    /// Copies `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// The caller bounds the range by the read tail; bytes that were never
    /// written read as zero.
    pub fn read(&self, offset: u64, buf: &mut [u8]) {
        let mut pos = offset;
        let mut filled = 0;

        while filled < buf.len() {
            let (index, within) = locate(pos);
            let n = (buf.len() - filled).min(SEGMENT_SIZE - within);
            let dst = &mut buf[filled..filled + n];

            match self.segments.get(index).and_then(OnceLock::get) {
                Some(segment) => {
                    for (byte, cell) in dst.iter_mut().zip(&segment[within..within + n]) {
                        *byte = cell.load(Ordering::Relaxed);
                    }
                }
                None => dst.fill(0),
            }

            filled += n;
            pos += n as u64;
        }
    }

    /// Returns a copy of `length` bytes starting at `offset`.
    pub fn slice(&self, offset: u64, length: usize) -> Vec<u8> {
        let mut buf = vec![0u8; length];
        self.read(offset, &mut buf);
        buf
    }

    /// Current log length, including appends that are not yet visible.
    pub fn len(&self) -> u64 {
        self.length.load(Ordering::Acquire)
    }

    /// Whether nothing was ever appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of bytes the log can hold.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Path of the backing file in durable mode.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn write_at(&self, offset: u64, bytes: &[u8]) {
        let mut pos = offset;
        let mut src = bytes;

        while !src.is_empty() {
            let (index, within) = locate(pos);
            let n = src.len().min(SEGMENT_SIZE - within);
            let segment = self.segments[index].get_or_init(new_segment);

            for (cell, byte) in segment[within..within + n].iter().zip(&src[..n]) {
                cell.store(*byte, Ordering::Relaxed);
            }

            src = &src[n..];
            pos += n as u64;
        }
    }
}

impl std::fmt::Debug for DataLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLog")
            .field("length", &self.len())
            .field("capacity", &self.capacity)
            .field("path", &self.path)
            .finish()
    }
}

fn locate(pos: u64) -> (usize, usize) {
    (
        (pos / SEGMENT_SIZE as u64) as usize,
        (pos % SEGMENT_SIZE as u64) as usize,
    )
}

fn new_segment() -> Segment {
    (0..SEGMENT_SIZE)
        .map(|_| AtomicU8::new(0))
        .collect::<Vec<_>>()
        .into_boxed_slice()
}
