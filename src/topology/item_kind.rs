//! Item kinds whose ownership is tracked independently.

use std::fmt;

/// Families of addressable mesh entities. Each kind has its own local
/// numbering and its own synchronization index.
#[derive(
    Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum ItemKind {
    /// Top-dimensional cells.
    Cell,
    /// 0D vertices.
    Node,
    /// Codimension-1 faces.
    Face,
    /// 1D edges.
    Edge,
}

impl Default for ItemKind {
    fn default() -> Self {
        ItemKind::Cell
    }
}

impl ItemKind {
    /// Every kind, in tag order.
    pub const ALL: [ItemKind; 4] = [ItemKind::Cell, ItemKind::Node, ItemKind::Face, ItemKind::Edge];

    /// Small per-kind offset added to a base tag so that concurrent exchanges
    /// of different kinds never match each other's messages.
    pub const fn tag_offset(self) -> u16 {
        match self {
            ItemKind::Cell => 0,
            ItemKind::Node => 1,
            ItemKind::Face => 2,
            ItemKind::Edge => 3,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemKind::Cell => "cell",
            ItemKind::Node => "node",
            ItemKind::Face => "face",
            ItemKind::Edge => "edge",
        };
        f.write_str(name)
    }
}
