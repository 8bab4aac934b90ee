//! Owner and ghost lists of two neighbours must describe the same items in
//! the same order, whatever local numbering each side uses.

mod util;

use halo_sync::prelude::*;
use proptest::collection::vec;
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use util::{Decomp, run_ranks};

fn decomp_from(n_ranks: usize, items: Vec<(usize, u8)>) -> Decomp {
    let owners: Vec<usize> = items.iter().map(|&(o, _)| o).collect();
    let holders = items
        .iter()
        .map(|&(o, mask)| (0..n_ranks).filter(|&r| r != o && mask & (1 << r) != 0).collect())
        .collect();
    Decomp {
        n_ranks,
        owners,
        holders,
    }
}

fn random_decomp(rng: &mut SmallRng, n_ranks: usize, n_items: usize) -> Decomp {
    let items = (0..n_items)
        .map(|_| (rng.gen_range(0..n_ranks), rng.r#gen::<u8>()))
        .collect();
    decomp_from(n_ranks, items)
}

fn arb_decomp() -> impl Strategy<Value = Decomp> {
    (2usize..6).prop_flat_map(|n| {
        vec((0..n, any::<u8>()), 0..48).prop_map(move |items| decomp_from(n, items))
    })
}

proptest! {
    #[test]
    fn owned_and_ghost_lists_align(d in arb_decomp()) {
        let locals: Vec<_> = (0..d.n_ranks).map(|r| d.local(r)).collect();
        let indices: Vec<ItemSyncIndex> = locals
            .iter()
            .map(|l| ItemSyncIndex::build(ItemKind::Cell, &l.topology, &l.ownership).unwrap())
            .collect();

        for (p, ip) in indices.iter().enumerate() {
            for (slot, &q) in ip.neighbor_ranks().iter().enumerate() {
                let iq = &indices[q];
                let back = locals[q].topology.slot(p);
                prop_assert!(back.is_some(), "rank {q} does not list {p} as neighbour");
                let back = back.unwrap();

                let sent: Vec<usize> = ip.owned(slot).iter().map(|&i| locals[p].globals[i]).collect();
                let recv: Vec<usize> = iq.ghost(back).iter().map(|&i| locals[q].globals[i]).collect();
                prop_assert_eq!(sent, recv);
            }
            prop_assert_eq!(ip.total_ghost(), locals[p].ownership.ghost_items().count());
        }
    }
}

#[test]
fn random_decompositions_deliver_owner_values() {
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    for _ in 0..8 {
        let n_ranks = rng.gen_range(2..5);
        let n_items = rng.gen_range(1..64);
        let d = random_decomp(&mut rng, n_ranks, n_items);
        let results = run_ranks(n_ranks, |comm| {
            let local = d.local(comm.rank());
            let mut coord =
                SyncCoordinator::new(comm, local.topology.clone(), SyncConfig::default()).unwrap();
            coord.rebuild_index(ItemKind::Edge, &local.ownership).unwrap();
            // Tag each value with its global item so misplacement is visible.
            let mut values: Vec<u64> = local
                .globals
                .iter()
                .enumerate()
                .map(|(i, &g)| match local.ownership.is_ghost(i) {
                    Some(false) => g as u64 | 1 << 40,
                    _ => u64::MAX,
                })
                .collect();
            coord.synchronize(ItemKind::Edge, &mut values).unwrap();
            (local.globals, values)
        });
        for (globals, values) in results {
            let expected: Vec<u64> = globals.iter().map(|&g| g as u64 | 1 << 40).collect();
            assert_eq!(values, expected);
        }
    }
}
