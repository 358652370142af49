//! Generic iterate-to-fixpoint dataflow solver.
//!
//! The solver is parameterized by a lattice value type, a node visiting
//! order, and the two transfer functions. It knows nothing about Fortran;
//! the concrete analyses live in [`crate::dataflow`].

use indexmap::IndexMap;
use petgraph::graph::NodeIndex;
use tracing::debug;

/// Per-node `(in, out)` lattice values, in visiting order.
pub type InOutMap<T> = IndexMap<NodeIndex, (T, T)>;

/// Iterates transfer functions over `order` until two successive sweeps
/// produce equal maps.
///
/// `init` supplies each node's starting `(in, out)` pair. At each node the
/// solver sets `in := in_f(current, n)` and then `out := out_f(current, n)`,
/// where `current` is the map with every update so far this sweep already
/// applied. Pick `rev_post_order` for forward analyses and `rev_pre_order`
/// for backward ones to converge quickly.
///
/// Termination is the caller's contract: transfer functions must be monotone
/// over a lattice of finite height. Every analysis in this crate uses finite
/// subset lattices, which satisfy that trivially.
pub fn dataflow_solver<T, I, InF, OutF>(order: &[NodeIndex], init: I, mut in_f: InF, mut out_f: OutF) -> InOutMap<T>
where
    T: Clone + PartialEq,
    I: Fn(NodeIndex) -> (T, T),
    InF: FnMut(&InOutMap<T>, NodeIndex) -> T,
    OutF: FnMut(&InOutMap<T>, NodeIndex) -> T,
{
    let mut map: InOutMap<T> = order.iter().map(|&n| (n, init(n))).collect();
    let mut sweeps = 0usize;
    loop {
        let prev = map.clone();
        for &n in order {
            let new_in = in_f(&map, n);
            map.get_mut(&n).expect("solver only visits nodes of its own map").0 = new_in;
            let new_out = out_f(&map, n);
            map.get_mut(&n).expect("solver only visits nodes of its own map").1 = new_out;
        }
        sweeps += 1;
        if map == prev {
            debug!(sweeps, nodes = order.len(), "dataflow solver converged");
            return map;
        }
    }
}
