#![allow(dead_code)]
use halo_sync::{
    algs::communicator::LocalComm,
    overlap::neighbors::NeighborTopology,
    topology::ownership::ItemOwnership,
    topology::point::PointId,
};

pub fn pid(u: u64) -> PointId {
    PointId::new(u).unwrap()
}

/// Run `f` once per rank of a fresh in-process world, each on its own
/// thread, and collect the results in rank order.
pub fn run_ranks<F, R>(n: usize, f: F) -> Vec<R>
where
    F: Fn(LocalComm) -> R + Sync,
    R: Send,
{
    let world = LocalComm::world(n);
    let f = &f;
    std::thread::scope(|s| {
        let handles: Vec<_> = world
            .into_iter()
            .map(|comm| s.spawn(move || f(comm)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank thread panicked"))
            .collect()
    })
}

/// Global description of a decomposition: owner of every global item and
/// the ranks holding it as a ghost.
#[derive(Clone, Debug)]
pub struct Decomp {
    pub n_ranks: usize,
    pub owners: Vec<usize>,
    pub holders: Vec<Vec<usize>>,
}

/// One partition's view of a [`Decomp`].
pub struct Local {
    pub topology: NeighborTopology,
    pub ownership: ItemOwnership,
    /// Global item of every local index.
    pub globals: Vec<usize>,
}

impl Local {
    /// Local index of global item `g`, if present.
    pub fn local_of(&self, g: usize) -> Option<usize> {
        self.globals.iter().position(|&x| x == g)
    }
}

impl Decomp {
    /// Items of `rank` in local numbering. Odd ranks number their items in
    /// reverse global order so local order never matches key order.
    pub fn local(&self, rank: usize) -> Local {
        let mut globals: Vec<usize> = (0..self.owners.len())
            .filter(|&g| self.owners[g] == rank || self.holders[g].contains(&rank))
            .collect();
        if rank % 2 == 1 {
            globals.reverse();
        }
        let mut neighbours = std::collections::BTreeSet::new();
        let mut ownership = ItemOwnership::new(rank);
        for &g in &globals {
            let key = pid(g as u64 + 1);
            if self.owners[g] == rank {
                neighbours.extend(self.holders[g].iter().copied());
                ownership.push_owned(key, self.holders[g].iter().copied());
            } else {
                neighbours.insert(self.owners[g]);
                ownership.push_ghost(key, self.owners[g]);
            }
        }
        Local {
            topology: NeighborTopology::new(rank, neighbours).unwrap(),
            ownership,
            globals,
        }
    }

    /// A 1D strip of `per_rank` items per rank; each rank ghosts `width`
    /// items from each side neighbour.
    pub fn strip(n_ranks: usize, per_rank: usize, width: usize) -> Self {
        let n = n_ranks * per_rank;
        let owners: Vec<usize> = (0..n).map(|g| g / per_rank).collect();
        let mut holders = vec![Vec::new(); n];
        for g in 0..n {
            let r = owners[g];
            let pos = g % per_rank;
            if r > 0 && pos < width {
                holders[g].push(r - 1);
            }
            if r + 1 < n_ranks && pos >= per_rank - width {
                holders[g].push(r + 1);
            }
        }
        Decomp {
            n_ranks,
            owners,
            holders,
        }
    }
}

/// Value owned for global item `g` in tests.
pub fn owned_value(g: usize) -> f64 {
    g as f64 * 1.5 + 0.25
}
