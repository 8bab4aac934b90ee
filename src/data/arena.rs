//! Growable byte arena for pack/unpack buffers.
//!
//! [`BufferArena`] is a bump allocator over 64-byte aligned blocks. One
//! synchronization episode goes through four steps:
//!
//! 1. [`add_estimated_size`](BufferArena::add_estimated_size) once per
//!    buffer set (send, receive, several variables...),
//! 2. [`ensure_capacity`](BufferArena::ensure_capacity) grows the backing
//!    storage if the estimate does not fit,
//! 3. [`view`](BufferArena::view) or an [`ArenaCarver`] carves typed
//!    per-neighbour views at the watermark,
//! 4. [`reset`](BufferArena::reset) rewinds the watermark once every message
//!    that referenced those views has completed.
//!
//! Memory is never returned: capacity only grows, so repeated episodes of
//! the same shape reach a steady state with no allocation at all. Views are
//! described by offsets into the arena, and the borrow checker ties their
//! lifetime to the arena borrow, so a `reset` while a view is alive does not
//! compile.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use crate::data::multi_view::{SegmentSpan, TypedMultiView};
use crate::sync_error::SyncError;

/// Every segment starts on a multiple of this many bytes.
pub const SEGMENT_ALIGN: usize = 64;

/// Default lower bound for the first allocation.
pub const DEFAULT_MIN_BYTES: usize = 4096;

#[repr(C, align(64))]
#[derive(Copy, Clone)]
struct ArenaBlock([u8; SEGMENT_ALIGN]);

// SAFETY: a byte array with no padding (size == align == 64); every bit
// pattern is valid and all-zero is a valid value.
unsafe impl Zeroable for ArenaBlock {}
unsafe impl Pod for ArenaBlock {}

const_assert_eq!(std::mem::size_of::<ArenaBlock>(), SEGMENT_ALIGN);
const_assert_eq!(std::mem::align_of::<ArenaBlock>(), SEGMENT_ALIGN);

#[inline]
fn round_up(bytes: usize) -> usize {
    bytes.div_ceil(SEGMENT_ALIGN).saturating_mul(SEGMENT_ALIGN)
}

/// Bytes needed for `counts` segments of `T`, padding included.
pub fn padded_size<T>(counts: &[usize]) -> usize {
    counts.iter().fold(0usize, |acc, &c| {
        acc.saturating_add(round_up(c.saturating_mul(size_of::<T>())))
    })
}

fn check_value_type<T>() -> Result<(), SyncError> {
    if size_of::<T>() == 0 {
        return Err(SyncError::ZeroSizedValue);
    }
    if align_of::<T>() > SEGMENT_ALIGN {
        return Err(SyncError::UnsupportedAlignment {
            align: align_of::<T>(),
            max: SEGMENT_ALIGN,
        });
    }
    Ok(())
}

/// Counters describing the arena's allocation history.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Number of times the backing storage was (re)allocated.
    pub grow_count: u64,
    /// Highest watermark reached, in bytes.
    pub peak_watermark: usize,
}

/// Bump arena of 64-byte aligned blocks with a rewindable watermark.
pub struct BufferArena {
    blocks: Vec<ArenaBlock>,
    watermark: usize,
    estimated: usize,
    min_bytes: usize,
    growth_factor: usize,
    stats: ArenaStats,
}

impl Default for BufferArena {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferArena {
    /// Empty arena; nothing is allocated until the first `ensure_capacity`.
    pub fn new() -> Self {
        Self::with_growth(DEFAULT_MIN_BYTES, 2)
    }

    /// Empty arena with a minimum first allocation of `min_bytes` and
    /// geometric growth by `growth_factor` (at least 1).
    pub fn with_growth(min_bytes: usize, growth_factor: usize) -> Self {
        Self {
            blocks: Vec::new(),
            watermark: 0,
            estimated: 0,
            min_bytes,
            growth_factor: growth_factor.max(1),
            stats: ArenaStats::default(),
        }
    }

    /// Current capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.blocks.len() * SEGMENT_ALIGN
    }

    /// Next free byte offset.
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// Bytes requested through `add_estimated_size` since the last reset.
    pub fn estimated(&self) -> usize {
        self.estimated
    }

    /// Allocation counters.
    pub fn stats(&self) -> ArenaStats {
        self.stats
    }

    /// Add the worst-case footprint of one buffer set of `T`, one segment
    /// per entry of `counts`.
    pub fn add_estimated_size<T: Pod>(&mut self, counts: &[usize]) {
        self.estimated = self.estimated.saturating_add(padded_size::<T>(counts));
    }

    /// Grow the backing storage to hold at least the accumulated estimate.
    ///
    /// Never shrinks. When growing, the new capacity is the largest of the
    /// estimate, `growth_factor` times the old capacity and the configured
    /// minimum.
    ///
    /// # Errors
    /// [`SyncError::CapacityExhausted`] if the allocation fails.
    pub fn ensure_capacity(&mut self) -> Result<(), SyncError> {
        let needed = self.estimated.max(self.watermark);
        let old = self.capacity();
        if needed <= old {
            return Ok(());
        }
        let target = round_up(
            needed
                .max(old.saturating_mul(self.growth_factor))
                .max(self.min_bytes),
        );
        let n_blocks = target / SEGMENT_ALIGN;
        self.blocks
            .try_reserve_exact(n_blocks - self.blocks.len())
            .map_err(|_| SyncError::CapacityExhausted { requested: target })?;
        self.blocks.resize(n_blocks, ArenaBlock::zeroed());
        self.stats.grow_count += 1;
        log::info!("buffer arena grown from {old} to {target} bytes (needed {needed})");
        Ok(())
    }

    /// Rewind the watermark and the estimate; memory is kept.
    ///
    /// Only call once every message referencing earlier views has completed.
    pub fn reset(&mut self) {
        self.watermark = 0;
        self.estimated = 0;
    }

    /// Carve one view of `counts.len()` segments at the watermark.
    ///
    /// # Errors
    /// [`SyncError::ArenaOverflow`] if the arena is too small (call
    /// `ensure_capacity` first), or a value-type error from the checks on `T`.
    pub fn view<T: Pod>(&mut self, counts: &[usize]) -> Result<TypedMultiView<'_, T>, SyncError> {
        self.carver().view(counts)
    }

    /// Hand out a carver able to produce several simultaneously live views.
    pub fn carver(&mut self) -> ArenaCarver<'_> {
        let Self {
            blocks,
            watermark,
            stats,
            ..
        } = self;
        let capacity = blocks.len() * SEGMENT_ALIGN;
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(blocks.as_mut_slice());
        let start = (*watermark).min(bytes.len());
        ArenaCarver {
            rest: &mut bytes[start..],
            watermark,
            peak: &mut stats.peak_watermark,
            capacity,
        }
    }
}

impl std::fmt::Debug for BufferArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferArena")
            .field("capacity", &self.capacity())
            .field("watermark", &self.watermark)
            .field("estimated", &self.estimated)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Splits the unused tail of an arena into views that can be alive at the
/// same time. Every carved view advances the arena's watermark.
pub struct ArenaCarver<'a> {
    rest: &'a mut [u8],
    watermark: &'a mut usize,
    peak: &'a mut usize,
    capacity: usize,
}

impl<'a> ArenaCarver<'a> {
    /// Carve `counts.len()` segments of `T` from the front of the free tail.
    pub fn view<T: Pod>(&mut self, counts: &[usize]) -> Result<TypedMultiView<'a, T>, SyncError> {
        check_value_type::<T>()?;
        let mut spans = Vec::with_capacity(counts.len());
        let mut total = 0usize;
        for &count in counts {
            spans.push(SegmentSpan {
                start: total,
                count,
            });
            total = total.saturating_add(round_up(count.saturating_mul(size_of::<T>())));
        }
        if total > self.rest.len() {
            return Err(SyncError::ArenaOverflow {
                requested: total,
                offset: *self.watermark,
                capacity: self.capacity,
            });
        }
        let (head, tail) = std::mem::take(&mut self.rest).split_at_mut(total);
        self.rest = tail;
        *self.watermark += total;
        *self.peak = (*self.peak).max(*self.watermark);
        Ok(TypedMultiView::new(head, spans))
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}
