//! Data module: buffer arena and typed multi-segment views
#![warn(missing_docs)]

pub mod arena;
pub mod multi_view;

pub use arena::{ArenaCarver, ArenaStats, BufferArena, SEGMENT_ALIGN};
pub use multi_view::{SegmentSpan, TypedMultiView};
