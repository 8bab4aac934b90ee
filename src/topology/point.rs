//! `PointId`: a globally stable key for mesh items
//!
//! Every item taking part in ghost exchange carries a key that is identical
//! on every partition holding a copy of it. Both sides of a neighbour pair
//! sort their index lists by this key, which is what lets positions in a
//! message line up without sending any ids.
//!
//! `PointId` wraps a nonzero `u64` so that 0 stays reserved as an invalid or
//! sentinel value.

use std::{fmt, num::NonZeroU64};

use crate::sync_error::SyncError;

/// Globally unique, partition-independent item key.
///
/// # Memory layout
/// This type is `repr(transparent)` over `NonZeroU64`, so `Option<PointId>`
/// is the same size as `u64`.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct PointId(NonZeroU64);

impl PointId {
    /// Creates a new `PointId` from a raw `u64` value.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidPointId`] if `raw == 0`.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use halo_sync::topology::point::PointId;
    /// let p = PointId::new(7).unwrap();
    /// assert_eq!(p.get(), 7);
    /// ```
    #[inline]
    pub fn new(raw: u64) -> Result<Self, SyncError> {
        NonZeroU64::new(raw)
            .map(PointId)
            .ok_or(SyncError::InvalidPointId)
    }

    /// Returns the inner `u64` value of this `PointId`.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PointId({})", self.get())
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl TryFrom<u64> for PointId {
    type Error = SyncError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        PointId::new(raw)
    }
}

impl From<PointId> for u64 {
    fn from(p: PointId) -> u64 {
        p.get()
    }
}
