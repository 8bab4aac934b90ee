//! Re-export public algorithms.

pub mod communicator;
pub mod sync;
pub mod wire;

pub use sync::{SyncConfig, SyncCoordinator};
