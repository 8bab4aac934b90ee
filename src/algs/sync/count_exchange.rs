//! Cross-check index-list lengths with every neighbour.
//!
//! Values travel without any length or id header, so a partition whose
//! owned list for a neighbour is longer or shorter than that neighbour's
//! ghost list would silently shift every following value. This collective
//! exchanges one [`WireCount`] per neighbour and compares both directions.
//! Every send/receive handle is drained before returning, even on error.

use std::collections::BTreeMap;

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{WireCount, cast_slice, cast_slice_mut, expect_exact_len};
use crate::overlap::sync_index::ItemSyncIndex;
use crate::sync_error::SyncError;

/// Exchange `(owned, ghost)` counts with every neighbour of `index` and
/// check that each neighbour sends what we expect and expects what we send.
pub fn verify_counts<C>(index: &ItemSyncIndex, comm: &C, tag: CommTag) -> Result<(), SyncError>
where
    C: Communicator,
{
    let owned = index.owned_counts();
    let ghost = index.ghost_counts();

    // 1) post all receives
    let mut recv_count: BTreeMap<usize, (usize, C::RecvHandle)> = BTreeMap::new();
    for (slot, &nbr) in index.neighbor_ranks().iter().enumerate() {
        let mut cnt = WireCount::new(0, 0);
        let h = comm.irecv(
            nbr,
            tag.as_u16(),
            cast_slice_mut(std::slice::from_mut(&mut cnt)),
        );
        recv_count.insert(nbr, (slot, h));
    }

    // 2) post all sends
    let mut pending_sends = Vec::with_capacity(owned.len());
    for (slot, &nbr) in index.neighbor_ranks().iter().enumerate() {
        let count = WireCount::new(owned[slot], ghost[slot]);
        pending_sends.push(comm.isend(
            nbr,
            tag.as_u16(),
            cast_slice(std::slice::from_ref(&count)),
        ));
    }

    // 3) wait for all receives, keep the first error but drain the rest
    let mut maybe_err = None;
    for (nbr, (slot, h)) in recv_count {
        let outcome = match h.wait() {
            Some(data) => expect_exact_len(data.len(), size_of::<WireCount>())
                .map_err(|detail| SyncError::TopologyInconsistency {
                    neighbor: nbr,
                    detail: format!("count header: {detail}"),
                })
                .and_then(|()| {
                    let mut remote = WireCount::new(0, 0);
                    cast_slice_mut(std::slice::from_mut(&mut remote)).copy_from_slice(&data);
                    check_pair(nbr, owned[slot], ghost[slot], remote)
                }),
            None => Err(SyncError::CommError {
                neighbor: nbr,
                source: format!("failed to receive counts from rank {nbr}").into(),
            }),
        };
        if let Err(e) = outcome {
            maybe_err.get_or_insert(e);
        }
    }

    // 4) always drain all send handles before returning
    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => {
            log::debug!(
                "rank {}: {} sync index counts agree with {} neighbours",
                index.rank(),
                index.kind(),
                index.num_neighbors()
            );
            Ok(())
        }
    }
}

fn check_pair(nbr: usize, owned: usize, ghost: usize, remote: WireCount) -> Result<(), SyncError> {
    if remote.send() != ghost {
        return Err(SyncError::TopologyInconsistency {
            neighbor: nbr,
            detail: format!(
                "neighbour sends {} values, {} ghost slots expect them",
                remote.send(),
                ghost
            ),
        });
    }
    if remote.recv() != owned {
        return Err(SyncError::TopologyInconsistency {
            neighbor: nbr,
            detail: format!(
                "neighbour expects {} values, {} owned items are sent",
                remote.recv(),
                owned
            ),
        });
    }
    Ok(())
}
