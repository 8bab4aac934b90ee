//! SyncError: Unified error type for halo-sync public APIs
//!
//! Every failure inside a synchronization episode is fatal for that episode:
//! the exchange is a lockstep collective, so there is no partial recovery.
//! The error is returned to the caller, who decides whether to abort.

use thiserror::Error;

use crate::topology::item_kind::ItemKind;

/// Unified error type for halo-sync operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Attempted to construct a PointId with a zero value (invalid).
    #[error("PointId must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidPointId,
    /// A rank appears twice in a neighbour set.
    #[error("Topology error: rank {0} listed more than once in the neighbour set")]
    DuplicateNeighbor(usize),
    /// The local rank was listed as its own neighbour.
    #[error("Topology error: rank {0} cannot be its own neighbour")]
    SelfNeighbor(usize),
    /// An item refers to a rank that is not in the neighbour set.
    #[error("Topology error: item {item} refers to rank {rank}, which is not a neighbour")]
    UnknownNeighbor { item: usize, rank: usize },
    /// Two items exchanged with the same neighbour share one global key,
    /// so their positions in the message cannot be told apart.
    #[error("Topology error: global key {key} appears twice in the list for rank {rank}")]
    DuplicateKey { key: u64, rank: usize },
    /// Index lists disagree with what the neighbour actually sent or expects.
    #[error("Topology inconsistency with rank {neighbor}: {detail}")]
    TopologyInconsistency { neighbor: usize, detail: String },
    /// A view was requested beyond the arena's current capacity.
    #[error("Arena overflow: requested {requested} bytes at offset {offset}, capacity {capacity}")]
    ArenaOverflow {
        requested: usize,
        offset: usize,
        capacity: usize,
    },
    /// The arena could not grow its backing allocation.
    #[error("Arena allocation of {requested} bytes failed")]
    CapacityExhausted { requested: usize },
    /// The value type needs stricter alignment than arena segments provide.
    #[error("Value type alignment {align} exceeds arena segment alignment {max}")]
    UnsupportedAlignment { align: usize, max: usize },
    /// Zero-sized value types carry no data and cannot be viewed as bytes.
    #[error("Zero-sized value types cannot be synchronized")]
    ZeroSizedValue,
    /// No index has been built for this item kind.
    #[error("No synchronization index built for item kind {0}")]
    MissingIndex(ItemKind),
    /// The value array does not cover every local item of its kind.
    #[error("Value array for {kind} has {len} entries, index needs {needed}")]
    ValueArrayTooShort {
        kind: ItemKind,
        len: usize,
        needed: usize,
    },
    /// The transport failed to deliver a message.
    #[error("Communication error with rank {neighbor}: {source}")]
    CommError {
        neighbor: usize,
        #[source]
        source: CommFailure,
    },
}

/// Transport-level failure detail carried by [`SyncError::CommError`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CommFailure(pub String);

impl From<String> for CommFailure {
    fn from(s: String) -> Self {
        CommFailure(s)
    }
}

impl From<&str> for CommFailure {
    fn from(s: &str) -> Self {
        CommFailure(s.to_owned())
    }
}
