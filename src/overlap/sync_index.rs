//! Per-neighbour send/receive index lists for one item kind.
//!
//! For every neighbour slot the index keeps two ordered lists of local item
//! indices:
//!  - *owned*: items this partition owns and the neighbour holds as ghosts;
//!    their values are packed and sent.
//!  - *ghost*: items owned by the neighbour; received values are unpacked
//!    into them.
//!
//! Both lists are sorted by the items' global keys. The owner and the ghost
//! holder therefore derive the same positional order independently, which is
//! the only contract between the two ends of a message: no ids travel on the
//! wire.
//!
//! Lists are stored in CSR form (`offsets` + flat indices), one pair for
//! owned and one for ghost.

use itertools::Itertools;

use crate::debug_invariants::DebugInvariants;
use crate::overlap::neighbors::NeighborTopology;
use crate::sync_error::SyncError;
use crate::topology::item_kind::ItemKind;
use crate::topology::ownership::ItemClassifier;
use crate::topology::point::PointId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemSyncIndex {
    kind: ItemKind,
    my_rank: usize,
    neighbor_ranks: Vec<usize>,
    num_items: usize,
    owned_offsets: Vec<usize>,
    owned_idx: Vec<usize>,
    ghost_offsets: Vec<usize>,
    ghost_idx: Vec<usize>,
}

impl ItemSyncIndex {
    /// Build the index of `kind` from the decomposition's classification.
    ///
    /// # Errors
    /// - [`SyncError::UnknownNeighbor`] if a ghost's owner or an owned item's
    ///   holder is not in `topology`.
    /// - [`SyncError::SelfNeighbor`] if an owned item lists the local rank
    ///   as a ghost holder.
    /// - [`SyncError::DuplicateKey`] if two items exchanged with the same
    ///   neighbour share a key.
    pub fn build<C>(
        kind: ItemKind,
        topology: &NeighborTopology,
        classifier: &C,
    ) -> Result<Self, SyncError>
    where
        C: ItemClassifier + ?Sized,
    {
        let my_rank = topology.rank();
        let n_nbrs = topology.len();
        let mut owned: Vec<Vec<(PointId, usize)>> = vec![Vec::new(); n_nbrs];
        let mut ghost: Vec<Vec<(PointId, usize)>> = vec![Vec::new(); n_nbrs];
        let mut holders = Vec::new();

        let num_items = classifier.num_items();
        for item in 0..num_items {
            let owner = classifier.owner(item);
            let key = classifier.key(item);
            if owner == my_rank {
                classifier.ghost_holders(item, &mut holders);
                holders.sort_unstable();
                holders.dedup();
                for &h in &holders {
                    if h == my_rank {
                        return Err(SyncError::SelfNeighbor(h));
                    }
                    let slot = topology
                        .slot(h)
                        .ok_or(SyncError::UnknownNeighbor { item, rank: h })?;
                    owned[slot].push((key, item));
                }
            } else {
                let slot = topology
                    .slot(owner)
                    .ok_or(SyncError::UnknownNeighbor { item, rank: owner })?;
                ghost[slot].push((key, item));
            }
        }

        for (slot, &rank) in topology.ranks().iter().enumerate() {
            sort_by_key_checked(&mut owned[slot], rank)?;
            sort_by_key_checked(&mut ghost[slot], rank)?;
            if owned[slot].is_empty() && ghost[slot].is_empty() {
                log::warn!("{kind} sync index: neighbour rank {rank} is idle (nothing to exchange)");
            }
        }

        let (owned_offsets, owned_idx) = flatten(owned);
        let (ghost_offsets, ghost_idx) = flatten(ghost);
        let index = Self {
            kind,
            my_rank,
            neighbor_ranks: topology.ranks().to_vec(),
            num_items,
            owned_offsets,
            owned_idx,
            ghost_offsets,
            ghost_idx,
        };
        log::debug!(
            "rank {my_rank}: built {kind} sync index over {num_items} items, {} neighbours, {} owned / {} ghost entries",
            n_nbrs,
            index.total_owned(),
            index.total_ghost()
        );
        index.debug_assert_invariants();
        Ok(index)
    }

    /// Build from lists the caller has already ordered (one owned and one
    /// ghost list per neighbour slot). The caller is responsible for the
    /// cross-partition ordering contract.
    ///
    /// # Errors
    /// [`SyncError::TopologyInconsistency`] if the number of lists does not
    /// match the neighbour count or an index is out of `0..num_items`.
    pub fn from_ordered_lists(
        kind: ItemKind,
        topology: &NeighborTopology,
        num_items: usize,
        owned: Vec<Vec<usize>>,
        ghost: Vec<Vec<usize>>,
    ) -> Result<Self, SyncError> {
        let n_nbrs = topology.len();
        if owned.len() != n_nbrs || ghost.len() != n_nbrs {
            return Err(SyncError::TopologyInconsistency {
                neighbor: topology.rank(),
                detail: format!(
                    "expected {n_nbrs} lists per direction, got {} owned / {} ghost",
                    owned.len(),
                    ghost.len()
                ),
            });
        }
        let flat = |lists: Vec<Vec<usize>>| {
            let mut offsets = Vec::with_capacity(lists.len() + 1);
            offsets.push(0);
            let mut idx = Vec::new();
            for list in lists {
                idx.extend(list);
                offsets.push(idx.len());
            }
            (offsets, idx)
        };
        let (owned_offsets, owned_idx) = flat(owned);
        let (ghost_offsets, ghost_idx) = flat(ghost);
        let index = Self {
            kind,
            my_rank: topology.rank(),
            neighbor_ranks: topology.ranks().to_vec(),
            num_items,
            owned_offsets,
            owned_idx,
            ghost_offsets,
            ghost_idx,
        };
        index.validate_invariants()?;
        Ok(index)
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn rank(&self) -> usize {
        self.my_rank
    }

    /// Neighbour ranks in slot order, as captured at build time.
    pub fn neighbor_ranks(&self) -> &[usize] {
        &self.neighbor_ranks
    }

    pub fn num_neighbors(&self) -> usize {
        self.neighbor_ranks.len()
    }

    /// Number of local items of this kind the index was built over.
    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Owned local indices to send to the neighbour in `slot`.
    pub fn owned(&self, slot: usize) -> &[usize] {
        &self.owned_idx[self.owned_offsets[slot]..self.owned_offsets[slot + 1]]
    }

    /// Ghost local indices to fill from the neighbour in `slot`.
    pub fn ghost(&self, slot: usize) -> &[usize] {
        &self.ghost_idx[self.ghost_offsets[slot]..self.ghost_offsets[slot + 1]]
    }

    /// Owned list length per slot.
    pub fn owned_counts(&self) -> Vec<usize> {
        self.owned_offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Ghost list length per slot.
    pub fn ghost_counts(&self) -> Vec<usize> {
        self.ghost_offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn total_owned(&self) -> usize {
        self.owned_idx.len()
    }

    pub fn total_ghost(&self) -> usize {
        self.ghost_idx.len()
    }

    /// True if nothing is exchanged with the neighbour in `slot`.
    pub fn is_idle(&self, slot: usize) -> bool {
        self.owned(slot).is_empty() && self.ghost(slot).is_empty()
    }
}

fn sort_by_key_checked(list: &mut [(PointId, usize)], rank: usize) -> Result<(), SyncError> {
    list.sort_unstable_by_key(|&(key, _)| key);
    if let Some(((key, _), _)) = list.iter().tuple_windows().find(|(a, b)| a.0 == b.0) {
        return Err(SyncError::DuplicateKey {
            key: key.get(),
            rank,
        });
    }
    Ok(())
}

fn flatten(lists: Vec<Vec<(PointId, usize)>>) -> (Vec<usize>, Vec<usize>) {
    let mut offsets = Vec::with_capacity(lists.len() + 1);
    offsets.push(0);
    let mut idx = Vec::with_capacity(lists.iter().map(Vec::len).sum());
    for list in lists {
        idx.extend(list.into_iter().map(|(_, item)| item));
        offsets.push(idx.len());
    }
    (offsets, idx)
}

fn check_csr(
    offsets: &[usize],
    idx: &[usize],
    n_nbrs: usize,
    num_items: usize,
    rank: usize,
    what: &str,
) -> Result<(), SyncError> {
    let bad = |detail: String| SyncError::TopologyInconsistency {
        neighbor: rank,
        detail,
    };
    if offsets.len() != n_nbrs + 1 || offsets.first() != Some(&0) {
        return Err(bad(format!("{what} offsets malformed")));
    }
    if offsets.windows(2).any(|w| w[0] > w[1]) || offsets[n_nbrs] != idx.len() {
        return Err(bad(format!("{what} offsets not monotone")));
    }
    if let Some(&i) = idx.iter().find(|&&i| i >= num_items) {
        return Err(bad(format!("{what} index {i} out of range 0..{num_items}")));
    }
    Ok(())
}

impl DebugInvariants for ItemSyncIndex {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "ItemSyncIndex");
    }

    fn validate_invariants(&self) -> Result<(), SyncError> {
        let n = self.neighbor_ranks.len();
        check_csr(
            &self.owned_offsets,
            &self.owned_idx,
            n,
            self.num_items,
            self.my_rank,
            "owned",
        )?;
        check_csr(
            &self.ghost_offsets,
            &self.ghost_idx,
            n,
            self.num_items,
            self.my_rank,
            "ghost",
        )?;
        // An item is either sent or received, never both.
        let mut is_owned = vec![false; self.num_items];
        for &i in &self.owned_idx {
            is_owned[i] = true;
        }
        if let Some(&i) = self.ghost_idx.iter().find(|&&i| is_owned[i]) {
            return Err(SyncError::TopologyInconsistency {
                neighbor: self.my_rank,
                detail: format!("item {i} is both owned and ghost"),
            });
        }
        Ok(())
    }
}
