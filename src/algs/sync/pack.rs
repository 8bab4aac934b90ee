//! Gather owned values into send segments and scatter received values into
//! ghost slots.
//!
//! Packing writes one disjoint arena segment per neighbour, so with the
//! `rayon` feature neighbours are packed in parallel. Unpacking stays serial:
//! ghost lists of different neighbours target disjoint slots of one array,
//! which safe Rust cannot hand to several threads without splitting it.

use bytemuck::Pod;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::data::multi_view::TypedMultiView;
use crate::overlap::sync_index::ItemSyncIndex;

/// `send[n][i] = values[owned(n)[i]]` for every neighbour slot `n`.
pub fn pack<T>(index: &ItemSyncIndex, values: &[T], send: &mut TypedMultiView<'_, T>)
where
    T: Pod + Send + Sync,
{
    let segments = send.segments_mut();
    debug_assert_eq!(segments.len(), index.num_neighbors());

    #[cfg(feature = "rayon")]
    segments
        .into_par_iter()
        .enumerate()
        .for_each(|(slot, seg)| gather(seg, index.owned(slot), values));

    #[cfg(not(feature = "rayon"))]
    for (slot, seg) in segments.into_iter().enumerate() {
        gather(seg, index.owned(slot), values);
    }
}

/// `values[ghost(n)[i]] = recv[n][i]` for every neighbour slot `n`.
pub fn unpack<T>(index: &ItemSyncIndex, recv: &TypedMultiView<'_, T>, values: &mut [T])
where
    T: Pod,
{
    for slot in 0..recv.len() {
        for (&dst, &v) in index.ghost(slot).iter().zip(recv.segment(slot)) {
            values[dst] = v;
        }
    }
}

#[inline]
fn gather<T: Copy>(seg: &mut [T], items: &[usize], values: &[T]) {
    debug_assert_eq!(seg.len(), items.len());
    for (dst, &i) in seg.iter_mut().zip(items) {
        *dst = values[i];
    }
}
