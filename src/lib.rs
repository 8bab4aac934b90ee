#![cfg_attr(docsrs, feature(doc_cfg))]
//! # halo-sync
//!
//! halo-sync keeps the ghost copies of a distributed array consistent across
//! the partitions of a decomposed mesh. Each partition sends only the values
//! it owns that a neighbour holds as ghosts, and receives only its own ghosts.
//!
//! ## Pieces
//! - [`overlap::neighbors::NeighborTopology`]: the ordered neighbour set
//! - [`topology::ownership::ItemClassifier`]: owner/ghost classification
//!   supplied by the decomposition
//! - [`overlap::sync_index::ItemSyncIndex`]: per-neighbour owned and ghost
//!   index lists, ordered by global key
//! - [`data::arena::BufferArena`] and [`data::multi_view::TypedMultiView`]:
//!   reusable, aligned pack/unpack buffers
//! - [`algs::communicator::Communicator`]: pluggable transport (serial,
//!   in-process, MPI)
//! - [`algs::sync::SyncCoordinator`]: runs an episode
//!
//! ## Wire protocol
//! Messages are the raw bytes of the packed values, nothing else. The i-th
//! value sent by an owner lands in the i-th ghost slot of the receiver
//! because both sides sort their lists by the same global key. Use
//! [`SyncConfig::verify_counts_on_rebuild`](algs::sync::SyncConfig) to
//! cross-check list lengths whenever an index is rebuilt.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! halo-sync = "0.1"
//! # Optional features:
//! # features = ["rayon", "mpi-support"]
//! ```

pub mod algs;
pub mod data;
pub mod debug_invariants;
pub mod overlap;
pub mod sync_error;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{CommTag, Communicator, LocalComm, NoComm, Wait};
    pub use crate::algs::sync::{SyncConfig, SyncCoordinator, SyncStats};
    pub use crate::data::arena::BufferArena;
    pub use crate::data::multi_view::TypedMultiView;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::overlap::neighbors::NeighborTopology;
    pub use crate::overlap::sync_index::ItemSyncIndex;
    pub use crate::sync_error::SyncError;
    pub use crate::topology::item_kind::ItemKind;
    pub use crate::topology::ownership::{Classification, ItemClassifier, ItemOwnership};
    pub use crate::topology::point::PointId;
}
