mod util;

use halo_sync::prelude::*;
use util::{Decomp, owned_value, pid, run_ranks};

fn coordinator(comm: LocalComm, topology: NeighborTopology) -> SyncCoordinator<LocalComm> {
    SyncCoordinator::new(comm, topology, SyncConfig::default()).unwrap()
}

#[test]
fn two_partitions_ghosts_receive_owned_values() {
    // Rank 0 owns A (key 1) and B (key 2); rank 1 holds them as ghosts.
    let results = run_ranks(2, |comm| {
        let rank = comm.rank();
        let topo = NeighborTopology::new(rank, [1 - rank]).unwrap();
        let mut own = ItemOwnership::new(rank);
        let mut values = if rank == 0 {
            own.push_owned(pid(1), [1]);
            own.push_owned(pid(2), [1]);
            vec![1.5f64, 2.5]
        } else {
            own.push_owned(pid(3), []);
            own.push_ghost(pid(1), 0);
            own.push_ghost(pid(2), 0);
            vec![-7.0f64, 0.0, 0.0]
        };
        let mut coord = coordinator(comm, topo);
        coord.rebuild_index(ItemKind::Cell, &own).unwrap();
        coord.synchronize(ItemKind::Cell, &mut values).unwrap();
        values
    });
    assert_eq!(results[0], vec![1.5, 2.5]);
    assert_eq!(results[1], vec![-7.0, 1.5, 2.5]);
}

#[test]
fn three_partition_ring_with_one_sided_neighbours() {
    // Ring 0 -> 1 -> 2 -> 0: each rank owns one item ghosted on its
    // successor only, so every rank sends nothing to its predecessor.
    let results = run_ranks(3, |comm| {
        let rank = comm.rank();
        let next = (rank + 1) % 3;
        let prev = (rank + 2) % 3;
        let topo = NeighborTopology::sorted(rank, [next, prev]).unwrap();
        let mut own = ItemOwnership::new(rank);
        own.push_owned(pid(rank as u64 + 1), [next]);
        own.push_ghost(pid(prev as u64 + 1), prev);
        own.push_owned(pid(100 + rank as u64), []);
        let prev_slot = topo.slot(prev).unwrap();
        let mut coord = coordinator(comm, topo);
        let idx = coord.rebuild_index(ItemKind::Node, &own).unwrap();
        assert!(idx.owned(prev_slot).is_empty());

        let mut values = vec![10.0 * (rank as f32 + 1.0), -1.0, 42.0];
        coord.synchronize(ItemKind::Node, &mut values).unwrap();
        (prev, values)
    });
    for (rank, (prev, values)) in results.iter().enumerate() {
        assert_eq!(values[0], 10.0 * (rank as f32 + 1.0));
        assert_eq!(values[1], 10.0 * (*prev as f32 + 1.0));
        assert_eq!(values[2], 42.0, "interior item must stay untouched");
    }
}

#[test]
fn idle_neighbour_completes_and_keeps_slots() {
    // Ranks 0 and 2 list each other as neighbours but share nothing.
    let results = run_ranks(3, |comm| {
        let rank = comm.rank();
        let nbrs: Vec<usize> = (0..3).filter(|&r| r != rank).collect();
        let topo = NeighborTopology::new(rank, nbrs).unwrap();
        let mut own = ItemOwnership::new(rank);
        match rank {
            0 => {
                own.push_ghost(pid(2), 1);
            }
            1 => {
                own.push_owned(pid(2), [0, 2]);
            }
            _ => {
                own.push_ghost(pid(2), 1);
                own.push_owned(pid(3), []);
            }
        }
        let mut coord = coordinator(comm, topo);
        coord.rebuild_index(ItemKind::Cell, &own).unwrap();
        let mut values: Vec<i32> = match rank {
            1 => vec![5],
            2 => vec![0, 9],
            _ => vec![0],
        };
        coord.synchronize(ItemKind::Cell, &mut values).unwrap();
        values
    });
    assert_eq!(results, vec![vec![5], vec![5], vec![5, 9]]);
}

#[test]
fn strip_round_trip_owned_untouched_and_idempotent() {
    let decomp = Decomp::strip(4, 6, 2);
    let results = run_ranks(decomp.n_ranks, |comm| {
        let local = decomp.local(comm.rank());
        let mut coord = coordinator(comm, local.topology.clone());
        coord.rebuild_index(ItemKind::Cell, &local.ownership).unwrap();

        let mut values: Vec<f64> = local
            .globals
            .iter()
            .enumerate()
            .map(|(i, &g)| match local.ownership.is_ghost(i) {
                Some(false) => owned_value(g),
                _ => f64::NAN,
            })
            .collect();
        let owned_before: Vec<u64> = local
            .ownership
            .owned_items()
            .map(|i| values[i].to_bits())
            .collect();

        coord.synchronize(ItemKind::Cell, &mut values).unwrap();
        let first = values.clone();
        coord.synchronize(ItemKind::Cell, &mut values).unwrap();

        let owned_after: Vec<u64> = local
            .ownership
            .owned_items()
            .map(|i| values[i].to_bits())
            .collect();
        assert_eq!(owned_before, owned_after);
        assert_eq!(first, values, "second episode changed ghosts");
        (local.globals, values, coord.stats())
    });

    for (globals, values, stats) in results {
        for (i, &g) in globals.iter().enumerate() {
            assert_eq!(values[i], owned_value(g), "global item {g}");
        }
        assert_eq!(stats.episodes, 2);
        assert_eq!(stats.messages_sent, stats.messages_received);
    }
}

#[test]
fn several_variables_share_one_episode() {
    let decomp = Decomp::strip(3, 4, 1);
    let results = run_ranks(decomp.n_ranks, |comm| {
        let local = decomp.local(comm.rank());
        let mut coord = coordinator(comm, local.topology.clone());
        coord.rebuild_index(ItemKind::Face, &local.ownership).unwrap();

        let fill = |scale: u32| -> Vec<u32> {
            local
                .globals
                .iter()
                .enumerate()
                .map(|(i, &g)| match local.ownership.is_ghost(i) {
                    Some(false) => g as u32 * scale,
                    _ => 0,
                })
                .collect()
        };
        let mut a = fill(1);
        let mut b = fill(1000);
        coord
            .synchronize_many(ItemKind::Face, &mut [&mut a[..], &mut b[..]])
            .unwrap();
        (local.globals, a, b)
    });
    for (globals, a, b) in results {
        for (i, &g) in globals.iter().enumerate() {
            assert_eq!(a[i], g as u32);
            assert_eq!(b[i], g as u32 * 1000);
        }
    }
}

#[test]
fn kinds_are_synchronized_independently() {
    let cells = Decomp::strip(2, 5, 2);
    let nodes = Decomp::strip(2, 3, 1);
    let results = run_ranks(2, |comm| {
        let rank = comm.rank();
        let lc = cells.local(rank);
        let ln = nodes.local(rank);
        let mut coord = coordinator(comm, lc.topology.clone());
        coord.rebuild_index(ItemKind::Cell, &lc.ownership).unwrap();
        coord.rebuild_index(ItemKind::Node, &ln.ownership).unwrap();

        let init = |l: &util::Local| -> Vec<[f32; 3]> {
            l.globals
                .iter()
                .enumerate()
                .map(|(i, &g)| match l.ownership.is_ghost(i) {
                    Some(false) => [g as f32, 1.0, -(g as f32)],
                    _ => [0.0; 3],
                })
                .collect()
        };
        let mut cv = init(&lc);
        let mut nv = init(&ln);
        coord.synchronize(ItemKind::Node, &mut nv).unwrap();
        coord.synchronize(ItemKind::Cell, &mut cv).unwrap();
        (lc.globals, cv, ln.globals, nv)
    });
    for (cg, cv, ng, nv) in results {
        for (i, &g) in cg.iter().enumerate() {
            assert_eq!(cv[i], [g as f32, 1.0, -(g as f32)]);
        }
        for (i, &g) in ng.iter().enumerate() {
            assert_eq!(nv[i], [g as f32, 1.0, -(g as f32)]);
        }
    }
}

#[test]
fn rebuild_with_count_check_then_repartition() {
    let before = Decomp::strip(3, 4, 1);
    let after = Decomp::strip(3, 4, 2);
    let results = run_ranks(3, |comm| {
        let rank = comm.rank();
        let config = SyncConfig {
            verify_counts_on_rebuild: true,
            ..SyncConfig::default()
        };
        let l0 = before.local(rank);
        let mut coord = SyncCoordinator::new(comm, l0.topology.clone(), config).unwrap();
        coord.rebuild_index(ItemKind::Cell, &l0.ownership).unwrap();

        // Wider halo: same neighbours, new classification.
        let l1 = after.local(rank);
        coord.reset_topology(l1.topology.clone()).unwrap();
        coord.rebuild_index(ItemKind::Cell, &l1.ownership).unwrap();
        coord.verify_index(ItemKind::Cell).unwrap();

        let mut values: Vec<u64> = l1
            .globals
            .iter()
            .enumerate()
            .map(|(i, &g)| match l1.ownership.is_ghost(i) {
                Some(false) => g as u64 + 7,
                _ => 0,
            })
            .collect();
        coord.synchronize(ItemKind::Cell, &mut values).unwrap();
        (l1.globals, values)
    });
    for (globals, values) in results {
        for (i, &g) in globals.iter().enumerate() {
            assert_eq!(values[i], g as u64 + 7);
        }
    }
}

#[test]
fn mismatched_lists_are_caught_before_exchange() {
    let results = run_ranks(2, |comm| {
        let rank = comm.rank();
        let topo = NeighborTopology::new(rank, [1 - rank]).unwrap();
        let mut own = ItemOwnership::new(rank);
        if rank == 0 {
            own.push_owned(pid(1), [1]);
            own.push_owned(pid(2), [1]);
        } else {
            // Rank 1 only knows about one of the two shared items.
            own.push_ghost(pid(1), 0);
        }
        let mut coord = coordinator(comm, topo);
        let idx = ItemSyncIndex::build(ItemKind::Edge, coord.topology(), &own).unwrap();
        coord.install_index(idx).unwrap();
        coord.verify_index(ItemKind::Edge)
    });
    assert!(matches!(
        results[0],
        Err(SyncError::TopologyInconsistency { neighbor: 1, .. })
    ));
    assert!(matches!(
        results[1],
        Err(SyncError::TopologyInconsistency { neighbor: 0, .. })
    ));
}
