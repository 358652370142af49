use ahash::{AHashMap, AHashSet};
use petgraph::{graph::NodeIndex, graphmap::DiGraphMap, visit::EdgeRef};

use crate::{
    analysis::{Analysis, BB, BBGr, Label, pu_name},
    ast::{Block, ExprKind, Expression, Name, ProgramFile, ProgramUnit, StmtKind, Value},
    graph::{DomMap, rev_post_order, rev_pre_order, reverse_reachable_excluding, sccs, transitive_closure},
    semantics::{block_var_defs, block_var_uses},
    solver::{InOutMap, dataflow_solver},
    traverse::Traverse,
};

/// Injection from AST-block label to the AST-block, drawn from the
/// basic-block graphs of every program unit in the file.
pub type BlockMap<'a, A> = AHashMap<Label, &'a Block<Analysis<A>>>;

/// Variable name to the set of labels that define it.
pub type DefMap = AHashMap<Name, AHashSet<Label>>;

/// Definition label to the labels that use it.
pub type DUMap = AHashMap<Label, AHashSet<Label>>;

/// Use label to the labels that define it; the edge-reverse of [`DUMap`].
pub type UDMap = AHashMap<Label, AHashSet<Label>>;

/// Source to target of every edge that closes a loop (target dominates
/// source).
pub type BackEdgeMap = AHashMap<NodeIndex, NodeIndex>;

/// Program-unit name to the names of the subroutines and functions it calls.
pub type CallMap = AHashMap<String, AHashSet<Name>>;

/// Reflexive-transitive closure of def-use reachability over block labels.
pub type FlowsGraph = DiGraphMap<Label, ()>;

fn label_of<A>(b: &Block<Analysis<A>>) -> Label {
    b.a.ins_label.expect("AST-block carries no label; run the basic-block pass first")
}

/// Collects every labeled AST-block of the file's basic-block graphs.
pub fn gen_block_map<A>(pf: &ProgramFile<Analysis<A>>) -> BlockMap<'_, A> {
    fn walk<'a, A>(pu: &'a ProgramUnit<Analysis<A>>, bm: &mut BlockMap<'a, A>) {
        if let Some(gr) = &pu.a.bblocks {
            for n in gr.node_indices() {
                for b in gr.bb(n) {
                    bm.insert(label_of(b), b);
                }
            }
        }
        for sub in &pu.contained {
            walk(sub, bm);
        }
    }
    let mut bm = BlockMap::new();
    for pu in &pf.program_units {
        walk(pu, &mut bm);
    }
    bm
}

/// Groups the block map by defined variable.
pub fn gen_def_map<A>(bm: &BlockMap<'_, A>) -> DefMap {
    let mut dm = DefMap::new();
    for (&label, block) in bm {
        for v in block_var_defs(block) {
            dm.entry(v).or_default().insert(label);
        }
    }
    dm
}

/// Live-variable analysis: backward, union, visiting in reverse preorder.
///
/// `out(n) = ⋃ in(s)` over successors; `in(n) = gen(n) ∪ (out(n) − kill(n))`
/// with gen/kill folded left-to-right through the node's AST-blocks.
pub fn live_variable_analysis<A>(gr: &BBGr<Analysis<A>>) -> InOutMap<AHashSet<Name>> {
    let order = rev_pre_order(gr);
    let gen_kill: AHashMap<NodeIndex, (AHashSet<Name>, AHashSet<Name>)> =
        gr.node_indices().map(|n| (n, lva_gen_kill(gr.bb(n)))).collect();
    dataflow_solver(
        &order,
        |_| (AHashSet::new(), AHashSet::new()),
        |map, n| {
            let (r#gen, kill) = &gen_kill[&n];
            let out = &map[&n].1;
            let mut inn: AHashSet<Name> = out.difference(kill).cloned().collect();
            inn.extend(r#gen.iter().cloned());
            inn
        },
        |map, n| {
            gr.successors(n)
                .filter_map(|s| map.get(&s))
                .flat_map(|(inn, _)| inn.iter().cloned())
                .collect()
        },
    )
}

fn lva_gen_kill<A>(bb: &BB<Analysis<A>>) -> (AHashSet<Name>, AHashSet<Name>) {
    let mut r#gen = AHashSet::new();
    let mut kill = AHashSet::new();
    for b in bb {
        for u in block_var_uses(b) {
            if !kill.contains(&u) {
                r#gen.insert(u);
            }
        }
        kill.extend(block_var_defs(b));
    }
    (r#gen, kill)
}

/// Reaching definitions: forward, union, visiting in reverse postorder.
///
/// `in(n) = ⋃ out(p)` over predecessors; `out(n) = gen(n) ∪ (in(n) − kill(n))`
/// over the label lattice.
pub fn reaching_definitions<A>(dm: &DefMap, gr: &BBGr<Analysis<A>>) -> InOutMap<AHashSet<Label>> {
    let order = rev_post_order(gr);
    let gen_kill: AHashMap<NodeIndex, (AHashSet<Label>, AHashSet<Label>)> =
        gr.node_indices().map(|n| (n, rd_bb_gen_kill(dm, gr.bb(n)))).collect();
    dataflow_solver(
        &order,
        |_| (AHashSet::new(), AHashSet::new()),
        |map, n| {
            gr.predecessors(n)
                .filter_map(|p| map.get(&p))
                .flat_map(|(_, out)| out.iter().copied())
                .collect()
        },
        |map, n| {
            let (r#gen, kill) = &gen_kill[&n];
            let inn = &map[&n].0;
            let mut out: AHashSet<Label> = inn.difference(kill).copied().collect();
            out.extend(r#gen.iter().copied());
            out
        },
    )
}

fn rd_block_gen_kill<A>(dm: &DefMap, b: &Block<Analysis<A>>) -> (AHashSet<Label>, AHashSet<Label>) {
    let defs = block_var_defs(b);
    if defs.is_empty() {
        return (AHashSet::new(), AHashSet::new());
    }
    let r#gen: AHashSet<Label> = [label_of(b)].into_iter().collect();
    let mut kill = AHashSet::new();
    for v in &defs {
        if let Some(labels) = dm.get(v) {
            kill.extend(labels.iter().copied());
        }
    }
    (r#gen, kill)
}

// The standard folding law lifts per-block gen/kill to the basic block:
// gen' = (gen − kill_b) ∪ gen_b, kill' = (kill − gen_b) ∪ kill_b.
fn rd_bb_gen_kill<A>(dm: &DefMap, bb: &BB<Analysis<A>>) -> (AHashSet<Label>, AHashSet<Label>) {
    let mut r#gen = AHashSet::new();
    let mut kill = AHashSet::new();
    for b in bb {
        let (g, k) = rd_block_gen_kill(dm, b);
        r#gen = r#gen.difference(&k).copied().collect();
        r#gen.extend(g.iter().copied());
        kill = kill.difference(&g).copied().collect();
        kill.extend(k.iter().copied());
    }
    (r#gen, kill)
}

/// Def-use chains: which labels use each reaching definition.
///
/// Simulates one pass through each node's AST-blocks, carrying the node's
/// in-set of reaching definitions forward block by block.
pub fn gen_du_map<A>(
    bm: &BlockMap<'_, A>,
    dm: &DefMap,
    gr: &BBGr<Analysis<A>>,
    rd: &InOutMap<AHashSet<Label>>,
) -> DUMap {
    let mut du = DUMap::new();
    for (&n, (inn, _out)) in rd {
        let mut reaching: AHashSet<Label> = inn.clone();
        for b in gr.bb(n) {
            let uses = block_var_uses(b);
            if !uses.is_empty() {
                for &d in &reaching {
                    let Some(def_block) = bm.get(&d) else { continue };
                    if block_var_defs(def_block).iter().any(|v| uses.contains(v)) {
                        du.entry(d).or_default().insert(label_of(b));
                    }
                }
            }
            let (g, k) = rd_block_gen_kill(dm, b);
            reaching = reaching.difference(&k).copied().collect();
            reaching.extend(g.iter().copied());
        }
    }
    du
}

/// Use-def chains: the edge-reverse of [`gen_du_map`].
pub fn gen_ud_map(du: &DUMap) -> UDMap {
    let mut ud = UDMap::new();
    for (&d, uses) in du {
        for &u in uses {
            ud.entry(u).or_default().insert(d);
        }
    }
    ud
}

/// The flows-to graph: reflexive-transitive closure of the def-use relation
/// over every labeled block of the file.
pub fn gen_flows_to_graph<A>(bm: &BlockMap<'_, A>, du: &DUMap) -> FlowsGraph {
    let mut nodes: Vec<Label> = bm.keys().copied().collect();
    nodes.sort_unstable();
    transitive_closure(du, &nodes)
}

/// An edge `(s, t)` is a back edge exactly when `t` dominates `s`.
pub fn gen_back_edge_map<A>(dom_map: &DomMap, gr: &BBGr<A>) -> BackEdgeMap {
    let mut bedges = BackEdgeMap::new();
    for e in gr.graph().edge_references() {
        let (s, t) = (e.source(), e.target());
        if dom_map.get(&s).is_some_and(|ds| ds.contains(&t)) {
            bedges.insert(s, t);
        }
    }
    bedges
}

/// The natural loop of each back edge `(m, n)`: nodes that can reach `m`
/// without passing through `n`, restricted to `m`'s strongly connected
/// component, plus `n` itself. The SCC restriction guards irreducible
/// graphs.
pub fn loop_nodes<A>(bedges: &BackEdgeMap, gr: &BBGr<A>) -> Vec<AHashSet<NodeIndex>> {
    let comps = sccs(gr);
    let mut edges: Vec<(NodeIndex, NodeIndex)> = bedges.iter().map(|(&m, &n)| (m, n)).collect();
    edges.sort_unstable_by_key(|&(m, n)| (m.index(), n.index()));
    edges
        .into_iter()
        .map(|(m, n)| {
            let scc_m: AHashSet<NodeIndex> = comps
                .iter()
                .find(|c| c.contains(&m))
                .map(|c| c.iter().copied().collect())
                .unwrap_or_default();
            let mut body: AHashSet<NodeIndex> = reverse_reachable_excluding(gr, m, n)
                .intersection(&scc_m)
                .copied()
                .collect();
            body.insert(n);
            body
        })
        .collect()
}

/// Callees per program unit: explicit call statements plus function-call
/// heads. Units sharing a name merge by union.
pub fn gen_call_map<A>(pf: &ProgramFile<Analysis<A>>) -> CallMap {
    let mut cm = CallMap::new();
    for pu in &pf.program_units {
        collect_unit_calls(pu, &mut cm);
    }
    cm
}

fn collect_unit_calls<A>(pu: &ProgramUnit<Analysis<A>>, cm: &mut CallMap) {
    let mut callees = AHashSet::new();
    for st in pu.body.all_stmts() {
        if let StmtKind::Call { callee, .. } = &st.kind
            && let Some(n) = callee_name(callee)
        {
            callees.insert(n.clone());
        }
    }
    for e in pu.body.all_exprs() {
        if let ExprKind::FunctionCall { function, .. } = &e.kind
            && let Some(n) = callee_name(function)
        {
            callees.insert(n.clone());
        }
    }
    cm.entry(pu_name(pu)).or_default().extend(callees);
    for sub in &pu.contained {
        collect_unit_calls(sub, cm);
    }
}

fn callee_name<A>(e: &Expression<A>) -> Option<&Name> {
    match &e.kind {
        ExprKind::Value(Value::SubroutineName(n) | Value::FunctionName(n) | Value::Variable(n)) => Some(n),
        _ => None,
    }
}
