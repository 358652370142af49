use ahash::{AHashMap, AHashSet};
use petgraph::{
    algo::{dominators::simple_fast, kosaraju_scc},
    graph::NodeIndex,
    graphmap::DiGraphMap,
    visit::{Dfs, DfsPostOrder, NodeFiltered, Reversed, VisitMap},
};

use crate::analysis::{BBGr, Label};

/// Node to the set of its dominators (itself included).
pub type DomMap = AHashMap<NodeIndex, AHashSet<NodeIndex>>;

/// Node to its immediate dominator. The entry node has none.
pub type IDomMap = AHashMap<NodeIndex, NodeIndex>;

/// Dominator sets for every node reachable from the entry.
pub fn dominators<A>(gr: &BBGr<A>) -> DomMap {
    let doms = simple_fast(gr.graph(), gr.entry());
    gr.node_indices()
        .filter_map(|n| doms.dominators(n).map(|ds| (n, ds.collect())))
        .collect()
}

/// Immediate dominators for every reachable node other than the entry.
pub fn i_dominators<A>(gr: &BBGr<A>) -> IDomMap {
    let doms = simple_fast(gr.graph(), gr.entry());
    gr.node_indices()
        .filter_map(|n| doms.immediate_dominator(n).map(|d| (n, d)))
        .collect()
}

/// Depth-first postorder from the entry node.
pub fn post_order<A>(gr: &BBGr<A>) -> Vec<NodeIndex> {
    let mut dfs = DfsPostOrder::new(gr.graph(), gr.entry());
    let mut order = Vec::with_capacity(gr.node_count());
    while let Some(n) = dfs.next(gr.graph()) {
        order.push(n);
    }
    order
}

pub fn rev_post_order<A>(gr: &BBGr<A>) -> Vec<NodeIndex> {
    let mut order = post_order(gr);
    order.reverse();
    order
}

/// Depth-first preorder from the entry node.
pub fn pre_order<A>(gr: &BBGr<A>) -> Vec<NodeIndex> {
    let mut dfs = Dfs::new(gr.graph(), gr.entry());
    let mut order = Vec::with_capacity(gr.node_count());
    while let Some(n) = dfs.next(gr.graph()) {
        order.push(n);
    }
    order
}

pub fn rev_pre_order<A>(gr: &BBGr<A>) -> Vec<NodeIndex> {
    let mut order = pre_order(gr);
    order.reverse();
    order
}

/// Whole-graph topological ordering: reverse depth-first finish order over
/// every root. On a cyclic graph this degrades to reverse postorder rather
/// than failing.
pub fn topsort<A>(gr: &BBGr<A>) -> Vec<NodeIndex> {
    let g = gr.graph();
    let mut dfs = DfsPostOrder::empty(g);
    let mut finish = Vec::with_capacity(gr.node_count());
    for n in g.node_indices() {
        if !dfs.discovered.is_visited(&n) {
            dfs.move_to(n);
            while let Some(x) = dfs.next(g) {
                finish.push(x);
            }
        }
    }
    finish.reverse();
    finish
}

/// Strongly connected components, in petgraph's reverse topological order.
pub fn sccs<A>(gr: &BBGr<A>) -> Vec<Vec<NodeIndex>> {
    kosaraju_scc(gr.graph())
}

/// Nodes that can reach `from` without passing through `excluded`, found by
/// depth-first search over reversed edges. Includes `from` itself.
pub(crate) fn reverse_reachable_excluding<A>(
    gr: &BBGr<A>,
    from: NodeIndex,
    excluded: NodeIndex,
) -> AHashSet<NodeIndex> {
    let filtered = NodeFiltered::from_fn(Reversed(gr.graph()), move |n| n != excluded);
    let mut dfs = Dfs::new(&filtered, from);
    let mut seen = AHashSet::new();
    while let Some(n) = dfs.next(&filtered) {
        seen.insert(n);
    }
    seen
}

/// Reflexive-transitive closure of a label adjacency map, as a graph.
pub fn transitive_closure(edges: &AHashMap<Label, AHashSet<Label>>, nodes: &[Label]) -> DiGraphMap<Label, ()> {
    let mut closed = DiGraphMap::new();
    for &n in nodes {
        closed.add_node(n);
        for m in reach_from(edges, n) {
            closed.add_edge(n, m, ());
        }
    }
    closed
}

// Iterative DFS over the raw adjacency map; the reach set of `start`
// includes `start` itself.
fn reach_from(edges: &AHashMap<Label, AHashSet<Label>>, start: Label) -> AHashSet<Label> {
    let mut seen = AHashSet::new();
    let mut stack = vec![start];
    while let Some(n) = stack.pop() {
        if seen.insert(n)
            && let Some(succs) = edges.get(&n)
        {
            stack.extend(succs.iter().copied());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analysis;

    /// `0 -> 1 -> 2 -> 1`, the S5 shape.
    fn looped() -> BBGr<Analysis<()>> {
        let mut gr = BBGr::new();
        let n0 = gr.add_node(vec![]);
        let n1 = gr.add_node(vec![]);
        let n2 = gr.add_node(vec![]);
        gr.add_edge(n0, n1);
        gr.add_edge(n1, n2);
        gr.add_edge(n2, n1);
        gr
    }

    fn ix(i: usize) -> NodeIndex {
        NodeIndex::new(i)
    }

    #[test]
    fn dominators_of_linear_loop() {
        let gr = looped();
        let dm = dominators(&gr);
        assert_eq!(dm[&ix(0)], [ix(0)].into_iter().collect::<AHashSet<_>>());
        assert_eq!(dm[&ix(1)], [ix(0), ix(1)].into_iter().collect::<AHashSet<_>>());
        assert_eq!(dm[&ix(2)], [ix(0), ix(1), ix(2)].into_iter().collect::<AHashSet<_>>());
    }

    #[test]
    fn immediate_dominators_exclude_entry() {
        let gr = looped();
        let idm = i_dominators(&gr);
        assert!(!idm.contains_key(&ix(0)));
        assert_eq!(idm[&ix(1)], ix(0));
        assert_eq!(idm[&ix(2)], ix(1));
    }

    #[test]
    fn orders_cover_all_reachable_nodes() {
        let gr = looped();
        assert_eq!(post_order(&gr).len(), 3);
        assert_eq!(pre_order(&gr)[0], ix(0));
        assert_eq!(rev_post_order(&gr)[0], ix(0));
        let mut rpre = rev_pre_order(&gr);
        rpre.reverse();
        assert_eq!(rpre, pre_order(&gr));
    }

    #[test]
    fn closure_is_reflexive_and_transitive() {
        let mut edges: AHashMap<Label, AHashSet<Label>> = AHashMap::new();
        edges.insert(1, [2].into_iter().collect::<AHashSet<_>>());
        edges.insert(2, [3].into_iter().collect::<AHashSet<_>>());
        let closed = transitive_closure(&edges, &[1, 2, 3]);
        assert!(closed.contains_edge(1, 1));
        assert!(closed.contains_edge(1, 3));
        assert!(closed.contains_edge(2, 3));
        assert!(!closed.contains_edge(3, 1));
    }
}
