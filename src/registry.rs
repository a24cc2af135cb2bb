//! Append-only, id-addressed arena
//!
//! Backs the index, filter and trigger registries of a table. Entries live in
//! fixed-size buckets that are allocated lazily and never reallocated, so an
//! id stays valid for the life of the registry and a lookup never races with
//! growth.
//!
//! Publication mirrors the read tail of the data log: an id is reserved with
//! `fetch_add`, its slot is filled, and only then is the committed length
//! moved past it. Every slot below `len()` is therefore initialized.
//!
//! A registry may start its ids above zero (`starting_at`), so that ids handed
//! out by a reopened table do not collide with those recorded by earlier runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Entries per bucket
pub const BUCKET_SIZE: usize = 1024;

/// Maximum number of buckets
pub const MAX_BUCKETS: usize = 1024;

type Bucket<T> = Box<[OnceLock<T>]>;

/// Id-stable registry supporting concurrent `push` and `get`.
pub struct Registry<T> {
    buckets: Box<[OnceLock<Bucket<T>>]>,
    /// Id of slot 0
    first_id: usize,
    /// Next slot to hand out
    reserved: AtomicUsize,
    /// Every slot below this value is initialized
    committed: AtomicUsize,
}

impl<T> Registry<T> {
    /// Creates an empty registry. No bucket is allocated until the first push.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates an empty registry whose first id is `first_id`.
    pub fn starting_at(first_id: usize) -> Self {
        let buckets = (0..MAX_BUCKETS)
            .map(|_| OnceLock::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            buckets,
            first_id,
            reserved: AtomicUsize::new(0),
            committed: AtomicUsize::new(0),
        }
    }

    /// Maximum number of entries this registry can hold.
    pub fn capacity(&self) -> usize {
        MAX_BUCKETS * BUCKET_SIZE
    }

    /// Appends `value`, returning its id, or `None` if the registry is full.
    pub fn push(&self, value: T) -> Option<usize> {
        self.push_with(|_| value)
    }

    /// Id of the first entry pushed
    pub fn first_id(&self) -> usize {
        self.first_id
    }

    /// Appends the value built by `make`, which receives the id it will be
    /// stored under. Returns `None` if the registry is full.
    pub fn push_with<F>(&self, make: F) -> Option<usize>
    where
        F: FnOnce(usize) -> T,
    {
        let slot = self.reserved.fetch_add(1, Ordering::Relaxed);
        if slot >= self.capacity() {
            return None;
        }
        let id = self.first_id + slot;

        let bucket = self.buckets[slot / BUCKET_SIZE].get_or_init(|| {
            (0..BUCKET_SIZE)
                .map(|_| OnceLock::new())
                .collect::<Vec<_>>()
                .into_boxed_slice()
        });
        let filled = bucket[slot % BUCKET_SIZE].set(make(id)).is_ok();
        debug_assert!(filled, "registry slot {} filled twice", slot);

        // Publish in slot order so `len()` never covers an empty slot.
        while self
            .committed
            .compare_exchange_weak(slot, slot + 1, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            std::thread::yield_now();
        }

        Some(id)
    }

    /// Returns the entry stored under `id`, if it has been published.
    pub fn get(&self, id: usize) -> Option<&T> {
        let slot = id.checked_sub(self.first_id)?;
        if slot >= self.len() {
            return None;
        }
        self.buckets[slot / BUCKET_SIZE].get()?[slot % BUCKET_SIZE].get()
    }

    /// Number of published entries.
    pub fn len(&self) -> usize {
        self.committed.load(Ordering::Acquire)
    }

    /// Whether nothing has been published yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates entries published at the time of the call, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let len = self.len();
        (self.first_id..self.first_id + len).filter_map(move |id| self.get(id))
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
