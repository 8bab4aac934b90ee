//! Overlap module: who this partition exchanges with, and which items.
//!
//! [`neighbors`] holds the ordered neighbour set; [`sync_index`] the
//! per-neighbour owned/ghost index lists built from it.

pub mod neighbors;
pub mod sync_index;
