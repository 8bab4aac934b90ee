//! Item-level metadata supplied by the mesh decomposition.
//!
//! - [`point::PointId`]: globally stable item keys
//! - [`item_kind::ItemKind`]: families of items with independent numbering
//! - [`ownership`]: owner / ghost classification of local items

pub mod item_kind;
pub mod ownership;
pub mod point;

pub use item_kind::ItemKind;
pub use ownership::{Classification, ItemClassifier, ItemOwnership};
pub use point::PointId;
