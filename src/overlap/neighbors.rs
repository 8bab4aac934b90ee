//! Ordered set of neighbouring partitions.
//!
//! The position of a rank in this set is its *neighbour slot*: every
//! per-neighbour array in the crate (index lists, arena segments, message
//! handles) is indexed by slot, never by rank.

use std::collections::BTreeMap;

use crate::debug_invariants::DebugInvariants;
use crate::sync_error::SyncError;

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NeighborTopology {
    my_rank: usize,
    ranks: Vec<usize>,
    slot_of: BTreeMap<usize, usize>,
}

impl NeighborTopology {
    /// Build the neighbour set of `my_rank` from the decomposition, keeping
    /// the given order.
    ///
    /// # Errors
    /// [`SyncError::SelfNeighbor`] if `my_rank` is listed,
    /// [`SyncError::DuplicateNeighbor`] if a rank repeats.
    pub fn new<I>(my_rank: usize, ranks: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut out = Self {
            my_rank,
            ranks: Vec::new(),
            slot_of: BTreeMap::new(),
        };
        for rank in ranks {
            if rank == my_rank {
                return Err(SyncError::SelfNeighbor(rank));
            }
            if out.slot_of.insert(rank, out.ranks.len()).is_some() {
                return Err(SyncError::DuplicateNeighbor(rank));
            }
            out.ranks.push(rank);
        }
        Ok(out)
    }

    /// Same as [`new`](Self::new) but sorts ranks ascending first, which is
    /// the usual way to get identical ordering rules on every partition.
    pub fn sorted<I>(my_rank: usize, ranks: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut ranks: Vec<usize> = ranks.into_iter().collect();
        ranks.sort_unstable();
        Self::new(my_rank, ranks)
    }

    /// A partition with no neighbours.
    pub fn isolated(my_rank: usize) -> Self {
        Self {
            my_rank,
            ..Self::default()
        }
    }

    /// Rank of the local partition.
    pub fn rank(&self) -> usize {
        self.my_rank
    }

    /// Neighbour ranks in slot order.
    pub fn ranks(&self) -> &[usize] {
        &self.ranks
    }

    /// Number of neighbours.
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Slot of `rank`, if it is a neighbour.
    pub fn slot(&self, rank: usize) -> Option<usize> {
        self.slot_of.get(&rank).copied()
    }

    /// Rank at `slot`.
    pub fn rank_at(&self, slot: usize) -> Option<usize> {
        self.ranks.get(slot).copied()
    }

    pub fn contains(&self, rank: usize) -> bool {
        self.slot_of.contains_key(&rank)
    }
}

impl DebugInvariants for NeighborTopology {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "NeighborTopology");
    }

    fn validate_invariants(&self) -> Result<(), SyncError> {
        if self.slot_of.len() != self.ranks.len() {
            let dup = self
                .ranks
                .iter()
                .find(|r| self.ranks.iter().filter(|x| x == r).count() > 1)
                .copied()
                .unwrap_or(self.my_rank);
            return Err(SyncError::DuplicateNeighbor(dup));
        }
        for (slot, &rank) in self.ranks.iter().enumerate() {
            if rank == self.my_rank {
                return Err(SyncError::SelfNeighbor(rank));
            }
            if self.slot_of.get(&rank) != Some(&slot) {
                return Err(SyncError::TopologyInconsistency {
                    neighbor: rank,
                    detail: format!("slot map points rank {rank} away from slot {slot}"),
                });
            }
        }
        Ok(())
    }
}
