//! `SyncCoordinator`: one synchronization context per decomposed mesh.
//!
//! The coordinator owns everything an episode needs (neighbour topology,
//! per-kind index, buffer arena and transport) and is passed explicitly to
//! the code that synchronizes. It is created once the decomposition is
//! known; when ownership changes, indices are rebuilt through
//! [`rebuild_index`](SyncCoordinator::rebuild_index) or the whole topology
//! is replaced with [`reset_topology`](SyncCoordinator::reset_topology).
//!
//! An episode runs: index lookup → size/carve arena views → pack → post
//! receives, then sends → wait for all → unpack → rewind arena.

use std::collections::BTreeMap;

use bytemuck::Pod;

use crate::algs::communicator::{Communicator, Wait};
use crate::algs::sync::config::SyncConfig;
use crate::algs::sync::count_exchange::verify_counts;
use crate::algs::sync::pack::{pack, unpack};
use crate::algs::wire::expect_exact_len;
use crate::data::arena::{ArenaStats, BufferArena};
use crate::data::multi_view::TypedMultiView;
use crate::overlap::neighbors::NeighborTopology;
use crate::overlap::sync_index::ItemSyncIndex;
use crate::sync_error::SyncError;
use crate::topology::item_kind::ItemKind;
use crate::topology::ownership::ItemClassifier;

/// Running totals over all episodes of a coordinator.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub episodes: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

pub struct SyncCoordinator<C> {
    comm: C,
    topology: NeighborTopology,
    indices: BTreeMap<ItemKind, ItemSyncIndex>,
    arena: BufferArena,
    config: SyncConfig,
    stats: SyncStats,
}

impl<C> SyncCoordinator<C>
where
    C: Communicator,
{
    /// Create a coordinator for the partition `topology.rank()`.
    ///
    /// # Errors
    /// [`SyncError::TopologyInconsistency`] if the communicator's rank differs
    /// from the topology's, or a neighbour rank is outside the communicator.
    pub fn new(comm: C, topology: NeighborTopology, config: SyncConfig) -> Result<Self, SyncError> {
        check_topology(&comm, &topology)?;
        let arena = BufferArena::with_growth(config.min_arena_bytes, config.growth_factor);
        Ok(Self {
            comm,
            topology,
            indices: BTreeMap::new(),
            arena,
            config,
            stats: SyncStats::default(),
        })
    }

    /// Replace the neighbour set after a repartition. Every index is dropped
    /// and must be rebuilt; the arena keeps its capacity.
    pub fn reset_topology(&mut self, topology: NeighborTopology) -> Result<(), SyncError> {
        check_topology(&self.comm, &topology)?;
        log::debug!(
            "rank {}: topology replaced ({} -> {} neighbours), dropping {} indices",
            topology.rank(),
            self.topology.len(),
            topology.len(),
            self.indices.len()
        );
        self.topology = topology;
        self.indices.clear();
        Ok(())
    }

    /// Build (or rebuild) the index of `kind` from the current
    /// classification. With `verify_counts_on_rebuild`, list lengths are
    /// cross-checked with every neighbour, which makes this a collective.
    pub fn rebuild_index<K>(&mut self, kind: ItemKind, classifier: &K) -> Result<&ItemSyncIndex, SyncError>
    where
        K: ItemClassifier + ?Sized,
    {
        let index = ItemSyncIndex::build(kind, &self.topology, classifier)?;
        self.install_index(index)?;
        self.index(kind).ok_or(SyncError::MissingIndex(kind))
    }

    /// Install an index built elsewhere (for instance with
    /// [`ItemSyncIndex::from_ordered_lists`]).
    pub fn install_index(&mut self, index: ItemSyncIndex) -> Result<(), SyncError> {
        if index.rank() != self.topology.rank() || index.neighbor_ranks() != self.topology.ranks() {
            return Err(SyncError::TopologyInconsistency {
                neighbor: self.topology.rank(),
                detail: format!(
                    "{} index was built for rank {} with neighbours {:?}, topology has {:?}",
                    index.kind(),
                    index.rank(),
                    index.neighbor_ranks(),
                    self.topology.ranks()
                ),
            });
        }
        if self.config.verify_counts_on_rebuild {
            verify_counts(&index, &self.comm, self.config.count_tag(index.kind()))?;
        }
        self.indices.insert(index.kind(), index);
        Ok(())
    }

    /// Collective check of the `kind` index against every neighbour.
    pub fn verify_index(&self, kind: ItemKind) -> Result<(), SyncError> {
        let index = self.indices.get(&kind).ok_or(SyncError::MissingIndex(kind))?;
        verify_counts(index, &self.comm, self.config.count_tag(kind))
    }

    pub fn index(&self, kind: ItemKind) -> Option<&ItemSyncIndex> {
        self.indices.get(&kind)
    }

    pub fn topology(&self) -> &NeighborTopology {
        &self.topology
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn arena(&self) -> &BufferArena {
        &self.arena
    }

    pub fn arena_stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Refresh every ghost slot of `values` (indexed by local item of
    /// `kind`) from its owner. Owned slots are only read.
    ///
    /// Blocks until every message of the episode has completed.
    pub fn synchronize<T>(&mut self, kind: ItemKind, values: &mut [T]) -> Result<(), SyncError>
    where
        T: Pod + Send + Sync,
    {
        self.synchronize_many(kind, &mut [values])
    }

    /// Synchronize several arrays of the same kind and type in one episode:
    /// one arena sizing, one wait. Each array travels in its own message.
    pub fn synchronize_many<T>(&mut self, kind: ItemKind, vars: &mut [&mut [T]]) -> Result<(), SyncError>
    where
        T: Pod + Send + Sync,
    {
        let Self {
            comm,
            indices,
            arena,
            config,
            stats,
            ..
        } = self;
        let index = indices.get(&kind).ok_or(SyncError::MissingIndex(kind))?;
        for v in vars.iter() {
            if v.len() < index.num_items() {
                return Err(SyncError::ValueArrayTooShort {
                    kind,
                    len: v.len(),
                    needed: index.num_items(),
                });
            }
        }

        // Start from a clean arena even if a previous episode failed early.
        arena.reset();
        let result = run_episode(comm, index, arena, config, stats, vars);
        arena.reset();
        if result.is_ok() {
            stats.episodes += 1;
        }
        result
    }
}

fn check_topology<C: Communicator>(comm: &C, topology: &NeighborTopology) -> Result<(), SyncError> {
    if comm.rank() != topology.rank() {
        return Err(SyncError::TopologyInconsistency {
            neighbor: topology.rank(),
            detail: format!(
                "communicator rank {} does not match topology rank {}",
                comm.rank(),
                topology.rank()
            ),
        });
    }
    if let Some(&bad) = topology.ranks().iter().find(|&&r| r >= comm.size()) {
        return Err(SyncError::TopologyInconsistency {
            neighbor: bad,
            detail: format!("rank {bad} is outside a communicator of size {}", comm.size()),
        });
    }
    Ok(())
}

fn run_episode<C, T>(
    comm: &C,
    index: &ItemSyncIndex,
    arena: &mut BufferArena,
    config: &SyncConfig,
    stats: &mut SyncStats,
    vars: &mut [&mut [T]],
) -> Result<(), SyncError>
where
    C: Communicator,
    T: Pod + Send + Sync,
{
    let kind = index.kind();
    let ranks = index.neighbor_ranks();
    let send_counts = index.owned_counts();
    let recv_counts = index.ghost_counts();
    log::debug!(
        "rank {}: {kind} episode, {} variable(s), {} values out / {} in over {} neighbours",
        index.rank(),
        vars.len(),
        index.total_owned(),
        index.total_ghost(),
        ranks.len()
    );

    // 1) size and carve
    for _ in vars.iter() {
        arena.add_estimated_size::<T>(&send_counts);
        arena.add_estimated_size::<T>(&recv_counts);
    }
    arena.ensure_capacity()?;
    let mut carver = arena.carver();
    let mut sends: Vec<TypedMultiView<'_, T>> = Vec::with_capacity(vars.len());
    let mut recvs: Vec<TypedMultiView<'_, T>> = Vec::with_capacity(vars.len());
    for _ in vars.iter() {
        sends.push(carver.view::<T>(&send_counts)?);
        recvs.push(carver.view::<T>(&recv_counts)?);
    }

    // 2) pack
    for (values, send) in vars.iter().zip(sends.iter_mut()) {
        pack(index, values, send);
    }

    // 3) post receives before sends
    let mut pending_recvs = Vec::new();
    for (var, recv) in recvs.iter_mut().enumerate() {
        let tag = config.value_tag(kind, var).as_u16();
        for (slot, &nbr) in ranks.iter().enumerate() {
            if recv_counts[slot] == 0 {
                continue;
            }
            log::trace!("post irecv var={var} from={nbr} bytes={}", recv.segment_bytes(slot).len());
            let h = comm.irecv(nbr, tag, recv.segment_bytes_mut(slot));
            pending_recvs.push((var, slot, h));
        }
    }
    let mut pending_sends = Vec::new();
    for (var, send) in sends.iter().enumerate() {
        let tag = config.value_tag(kind, var).as_u16();
        for (slot, &nbr) in ranks.iter().enumerate() {
            if send_counts[slot] == 0 {
                continue;
            }
            let payload = send.segment_bytes(slot);
            log::trace!("post isend var={var} to={nbr} bytes={}", payload.len());
            pending_sends.push(comm.isend(nbr, tag, payload));
            stats.messages_sent += 1;
            stats.bytes_sent += payload.len() as u64;
        }
    }

    // 4) wait for everything; remember the first failure, drain the rest
    let mut maybe_err = None;
    for (var, slot, h) in pending_recvs {
        let nbr = ranks[slot];
        let dst = recvs[var].segment_bytes_mut(slot);
        let outcome = match h.wait() {
            Some(data) => expect_exact_len(data.len(), dst.len())
                .map(|()| {
                    dst.copy_from_slice(&data);
                    stats.messages_received += 1;
                    stats.bytes_received += data.len() as u64;
                })
                .map_err(|detail| SyncError::TopologyInconsistency {
                    neighbor: nbr,
                    detail: format!("{kind} halo payload: {detail}"),
                }),
            None => Err(SyncError::CommError {
                neighbor: nbr,
                source: format!("no {kind} halo data received from rank {nbr}").into(),
            }),
        };
        if let Err(e) = outcome {
            log::debug!("{kind} episode failure with rank {nbr}: {e}");
            maybe_err.get_or_insert(e);
        }
    }
    for send in pending_sends {
        let _ = send.wait();
    }
    if let Some(err) = maybe_err {
        return Err(err);
    }

    // 5) unpack
    for (values, recv) in vars.iter_mut().zip(recvs.iter()) {
        unpack(index, recv, values);
    }
    Ok(())
}
