//! Coordinator configuration.

use crate::algs::communicator::CommTag;
use crate::data::arena::DEFAULT_MIN_BYTES;
use crate::topology::item_kind::ItemKind;

/// Tag distance between variables synchronized in one episode; leaves room
/// for one tag per item kind.
const VARIABLE_STRIDE: u16 = ItemKind::ALL.len() as u16;

/// Offset separating count-verification traffic from value traffic.
const COUNT_CHECK_OFFSET: u16 = 0x4000;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// First tag used for value messages.
    pub base_tag: CommTag,
    /// Lower bound of the first arena allocation, in bytes.
    pub min_arena_bytes: usize,
    /// Geometric growth factor of the arena.
    pub growth_factor: usize,
    /// Cross-check list lengths with every neighbour after each index
    /// rebuild. This is a collective: all partitions must agree on it.
    pub verify_counts_on_rebuild: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_tag: CommTag::new(0x4A10),
            min_arena_bytes: DEFAULT_MIN_BYTES,
            growth_factor: 2,
            verify_counts_on_rebuild: false,
        }
    }
}

impl SyncConfig {
    /// Tag for variable number `variable` of an episode over `kind`.
    pub fn value_tag(&self, kind: ItemKind, variable: usize) -> CommTag {
        let var = (variable as u16).wrapping_mul(VARIABLE_STRIDE);
        self.base_tag.offset(var.wrapping_add(kind.tag_offset()))
    }

    /// Tag for the list-length cross-check of `kind`.
    pub fn count_tag(&self, kind: ItemKind) -> CommTag {
        self.base_tag
            .offset(COUNT_CHECK_OFFSET.wrapping_add(kind.tag_offset()))
    }
}
