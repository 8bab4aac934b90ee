//! Typed per-neighbour windows over carved arena bytes.
//!
//! A [`TypedMultiView`] does not own memory: it borrows a byte range carved
//! from a [`BufferArena`](crate::data::arena::BufferArena) and reinterprets
//! `len()` disjoint sub-ranges of it as `[T]`. Sub-ranges start on
//! [`SEGMENT_ALIGN`](crate::data::arena::SEGMENT_ALIGN) boundaries, so any
//! `Pod` type with alignment up to that value can be viewed without copying.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use bytemuck::Pod;

/// Location of one segment inside a view's byte range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SegmentSpan {
    /// Byte offset from the start of the view.
    pub start: usize,
    /// Number of `T` elements.
    pub count: usize,
}

/// Non-owning typed view of one segment per neighbour.
pub struct TypedMultiView<'a, T> {
    bytes: &'a mut [u8],
    spans: Vec<SegmentSpan>,
    flat_len: usize,
    _ty: PhantomData<T>,
}

impl<'a, T: Pod> TypedMultiView<'a, T> {
    /// Wrap `bytes` with the given segment layout.
    ///
    /// `spans` must be sorted, disjoint and lie within `bytes`; the arena's
    /// carver guarantees this.
    pub(crate) fn new(bytes: &'a mut [u8], spans: Vec<SegmentSpan>) -> Self {
        let flat_len = spans
            .last()
            .map_or(0, |s| s.start + s.count * size_of::<T>());
        debug_assert!(flat_len <= bytes.len());
        Self {
            bytes,
            spans,
            flat_len,
            _ty: PhantomData,
        }
    }

    /// Number of segments (one per neighbour).
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// True when the view has no segments.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Element count of segment `n`.
    pub fn count(&self, n: usize) -> usize {
        self.spans[n].count
    }

    /// Segment layout.
    pub fn spans(&self) -> &[SegmentSpan] {
        &self.spans
    }

    /// Segment `n` as exactly `count(n)` elements.
    pub fn segment(&self, n: usize) -> &[T] {
        bytemuck::cast_slice(self.segment_bytes(n))
    }

    /// Mutable segment `n`.
    pub fn segment_mut(&mut self, n: usize) -> &mut [T] {
        bytemuck::cast_slice_mut(self.segment_bytes_mut(n))
    }

    /// Raw bytes of segment `n`: the message payload for that neighbour.
    pub fn segment_bytes(&self, n: usize) -> &[u8] {
        let s = self.spans[n];
        &self.bytes[s.start..s.start + s.count * size_of::<T>()]
    }

    /// Mutable raw bytes of segment `n`.
    pub fn segment_bytes_mut(&mut self, n: usize) -> &mut [u8] {
        let s = self.spans[n];
        &mut self.bytes[s.start..s.start + s.count * size_of::<T>()]
    }

    /// One byte range covering every segment, padding included.
    pub fn flat_range(&self) -> &[u8] {
        &self.bytes[..self.flat_len]
    }

    /// Mutable flat range.
    pub fn flat_range_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.flat_len]
    }

    /// All segments at once, as disjoint mutable slices, so they can be
    /// filled in parallel.
    pub fn segments_mut(&mut self) -> Vec<&mut [T]> {
        let mut out = Vec::with_capacity(self.spans.len());
        let mut rest: &mut [u8] = &mut self.bytes[..];
        let mut consumed = 0;
        for s in &self.spans {
            let len = s.count * size_of::<T>();
            let (_pad, tail) = std::mem::take(&mut rest).split_at_mut(s.start - consumed);
            let (seg, tail) = tail.split_at_mut(len);
            rest = tail;
            consumed = s.start + len;
            out.push(bytemuck::cast_slice_mut(seg));
        }
        out
    }

    /// Shallow copy: a second view over the same bytes, valid while `self`
    /// is not used.
    pub fn reborrow(&mut self) -> TypedMultiView<'_, T> {
        TypedMultiView {
            bytes: &mut *self.bytes,
            spans: self.spans.clone(),
            flat_len: self.flat_len,
            _ty: PhantomData,
        }
    }
}

impl<T: Pod> Index<usize> for TypedMultiView<'_, T> {
    type Output = [T];

    fn index(&self, n: usize) -> &[T] {
        self.segment(n)
    }
}

impl<T: Pod> IndexMut<usize> for TypedMultiView<'_, T> {
    fn index_mut(&mut self, n: usize) -> &mut [T] {
        self.segment_mut(n)
    }
}

impl<T> std::fmt::Debug for TypedMultiView<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedMultiView")
            .field("spans", &self.spans)
            .field("flat_len", &self.flat_len)
            .finish()
    }
}
