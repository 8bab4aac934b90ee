//! Halo synchronization: pack owned values, exchange with neighbours,
//! unpack into ghosts.

pub mod config;
pub mod coordinator;
pub mod count_exchange;
pub mod pack;

pub use config::SyncConfig;
pub use coordinator::{SyncCoordinator, SyncStats};
pub use count_exchange::verify_counts;
