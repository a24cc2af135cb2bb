//! BTreeMap-based key to offsets map
//!
//! Offsets per key are kept sorted ascending. Appends reserve offsets in
//! increasing order but may insert out of order, so inserts place the offset
//! rather than push it.

use std::collections::BTreeMap;
use std::ops::Bound;

use super::key::IndexKey;

/// Storage offset type
pub type StorageOffset = u64;

/// Ordered map from key to the offsets where it occurs.
#[derive(Debug, Default)]
pub struct IndexTree {
    tree: BTreeMap<IndexKey, Vec<StorageOffset>>,
}

impl IndexTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an offset for a key, keeping the offsets sorted.
    pub fn insert(&mut self, key: IndexKey, offset: StorageOffset) {
        let offsets = self.tree.entry(key).or_default();

        // Fast path: the common case is the largest offset so far.
        if offsets.last().map_or(true, |last| *last < offset) {
            offsets.push(offset);
            return;
        }
        if let Err(pos) = offsets.binary_search(&offset) {
            offsets.insert(pos, offset);
        }
    }

    /// Offsets below `bound` stored under `key`, ascending.
    pub fn lookup_eq(&self, key: &IndexKey, bound: StorageOffset) -> Vec<StorageOffset> {
        self.tree
            .get(key)
            .map(|offsets| below(offsets, bound).to_vec())
            .unwrap_or_default()
    }

    /// Offsets below `bound` for keys in `[min, max]`, ascending.
    ///
    /// A missing endpoint leaves that side unbounded.
    pub fn lookup_range(
        &self,
        min: Option<&IndexKey>,
        max: Option<&IndexKey>,
        bound: StorageOffset,
    ) -> Vec<StorageOffset> {
        let min_bound = min.map_or(Bound::Unbounded, Bound::Included);
        let max_bound = max.map_or(Bound::Unbounded, Bound::Included);
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Vec::new();
            }
        }

        let mut result: Vec<StorageOffset> = self
            .tree
            .range::<IndexKey, _>((min_bound, max_bound))
            .flat_map(|(_, offsets)| below(offsets, bound).iter().copied())
            .collect();
        result.sort_unstable();
        result
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Total number of offsets
    pub fn offset_count(&self) -> usize {
        self.tree.values().map(Vec::len).sum()
    }
}

fn below(offsets: &[StorageOffset], bound: StorageOffset) -> &[StorageOffset] {
    let end = offsets.partition_point(|offset| *offset < bound);
    &offsets[..end]
}
