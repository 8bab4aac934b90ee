//! Ownership metadata for local items.
//!
//! The decomposition tells each partition, for every local item of a kind,
//! who owns it, what its global key is and, for owned items, which
//! neighbours keep a ghost copy. [`ItemClassifier`] is the seam through which
//! that information reaches the index builder; [`ItemOwnership`] is a
//! ready-made table implementation.

use crate::topology::point::PointId;

/// Source of per-item ownership classification, consulted only when a
/// synchronization index is (re)built.
pub trait ItemClassifier {
    /// Number of local items of this kind.
    fn num_items(&self) -> usize;

    /// Rank owning `item`.
    fn owner(&self, item: usize) -> usize;

    /// Partition-independent key of `item`.
    fn key(&self, item: usize) -> PointId;

    /// For an owned item, the neighbour ranks that hold it as a ghost.
    /// Implementations clear `out` before filling it.
    fn ghost_holders(&self, item: usize, out: &mut Vec<usize>);
}

/// Classification of a single item, as produced by an external function.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Classification {
    /// Owned locally, ghosted on the listed ranks.
    Owned { key: PointId, holders: Vec<usize> },
    /// Ghost copy of an item owned by `owner`.
    Ghost { key: PointId, owner: usize },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OwnershipEntry {
    pub owner: usize,
    pub key: PointId,
}

/// Table of item ownership, indexed by local item index.
///
/// Ghost holders of owned items are stored in CSR form.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ItemOwnership {
    my_rank: usize,
    entries: Vec<OwnershipEntry>,
    holder_offsets: Vec<usize>,
    holders: Vec<usize>,
}

impl ItemOwnership {
    /// Create an empty table for partition `my_rank`.
    pub fn new(my_rank: usize) -> Self {
        Self {
            my_rank,
            entries: Vec::new(),
            holder_offsets: vec![0],
            holders: Vec::new(),
        }
    }

    /// Build a table by calling `classify` for every local item `0..n`.
    ///
    /// This is the hook for ownership that changes between steps (for
    /// instance cells reclassified by material composition): rebuild the
    /// table with the current classification and rebuild the index from it.
    pub fn from_fn<F>(my_rank: usize, n: usize, mut classify: F) -> Self
    where
        F: FnMut(usize) -> Classification,
    {
        let mut table = Self::new(my_rank);
        table.entries.reserve(n);
        table.holder_offsets.reserve(n);
        for item in 0..n {
            match classify(item) {
                Classification::Owned { key, holders } => {
                    table.push_owned(key, holders);
                }
                Classification::Ghost { key, owner } => {
                    table.push_ghost(key, owner);
                }
            }
        }
        table
    }

    /// Append an owned item; returns its local index.
    pub fn push_owned<I>(&mut self, key: PointId, holders: I) -> usize
    where
        I: IntoIterator<Item = usize>,
    {
        self.entries.push(OwnershipEntry {
            owner: self.my_rank,
            key,
        });
        self.holders.extend(holders);
        self.holder_offsets.push(self.holders.len());
        self.entries.len() - 1
    }

    /// Append a ghost item owned by `owner`; returns its local index.
    pub fn push_ghost(&mut self, key: PointId, owner: usize) -> usize {
        self.entries.push(OwnershipEntry { owner, key });
        self.holder_offsets.push(self.holders.len());
        self.entries.len() - 1
    }

    /// Rank this table was built for.
    pub fn rank(&self) -> usize {
        self.my_rank
    }

    /// Number of local items.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no items are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retrieve the ownership entry for a local item.
    pub fn entry(&self, item: usize) -> Option<OwnershipEntry> {
        self.entries.get(item).copied()
    }

    /// Returns whether `item` is a ghost on this rank.
    pub fn is_ghost(&self, item: usize) -> Option<bool> {
        self.entry(item).map(|e| e.owner != self.my_rank)
    }

    /// Ranks holding a ghost copy of `item` (empty for ghosts).
    pub fn holders_of(&self, item: usize) -> &[usize] {
        match (self.holder_offsets.get(item), self.holder_offsets.get(item + 1)) {
            (Some(&lo), Some(&hi)) => &self.holders[lo..hi],
            _ => &[],
        }
    }

    /// Iterate over owned local indices.
    pub fn owned_items(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.owner == self.my_rank)
            .map(|(i, _)| i)
    }

    /// Iterate over ghost local indices.
    pub fn ghost_items(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.owner != self.my_rank)
            .map(|(i, _)| i)
    }
}

impl ItemClassifier for ItemOwnership {
    fn num_items(&self) -> usize {
        self.entries.len()
    }

    fn owner(&self, item: usize) -> usize {
        self.entries[item].owner
    }

    fn key(&self, item: usize) -> PointId {
        self.entries[item].key
    }

    fn ghost_holders(&self, item: usize, out: &mut Vec<usize>) {
        out.clear();
        out.extend_from_slice(self.holders_of(item));
    }
}
