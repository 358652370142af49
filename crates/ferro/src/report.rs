use std::collections::BTreeSet;

use ahash::AHashSet;
use petgraph::graph::NodeIndex;

use crate::{
    analysis::{Analysis, BBGr, Label, pu_name},
    ast::{ProgramFile, ProgramUnit},
    dataflow::{
        BlockMap, CallMap, DUMap, DefMap, FlowsGraph, gen_back_edge_map, gen_block_map, gen_call_map, gen_def_map,
        gen_du_map, gen_flows_to_graph, gen_ud_map, live_variable_analysis, loop_nodes, reaching_definitions,
    },
    graph::{dominators, i_dominators, post_order, rev_post_order, rev_pre_order, sccs, topsort},
    solver::InOutMap,
};

/// Renders every derived relation of every program unit that carries a
/// basic-block graph. Output is textual and deterministic: map keys and set
/// elements appear in sorted order.
pub fn show_data_flow<A>(pf: &ProgramFile<Analysis<A>>) -> String {
    let bm = gen_block_map(pf);
    let dm = gen_def_map(&bm);
    let cm = gen_call_map(pf);
    let mut out = String::new();
    let mut units: Vec<&ProgramUnit<Analysis<A>>> = Vec::new();
    collect_units(&pf.program_units, &mut units);
    for pu in units {
        if let Some(gr) = &pu.a.bblocks {
            show_unit(&mut out, &pu_name(pu), gr, &bm, &dm, &cm);
        }
    }
    out
}

fn collect_units<'a, A>(pus: &'a [ProgramUnit<Analysis<A>>], out: &mut Vec<&'a ProgramUnit<Analysis<A>>>) {
    for pu in pus {
        out.push(pu);
        collect_units(&pu.contained, out);
    }
}

fn show_unit<A>(
    out: &mut String,
    name: &str,
    gr: &BBGr<Analysis<A>>,
    bm: &BlockMap<'_, A>,
    dm: &DefMap,
    cm: &CallMap,
) {
    let dom_map = dominators(gr);
    let lva = live_variable_analysis(gr);
    let rd = reaching_definitions(dm, gr);
    let du = gen_du_map(bm, dm, gr, &rd);
    let ud = gen_ud_map(&du);
    let flows = gen_flows_to_graph(bm, &du);
    let bedges = gen_back_edge_map(&dom_map, gr);

    out.push_str(&format!("ProgramUnit {name}\n"));
    out.push_str(&format!("  callMap:      {}\n", fmt_call_map(cm)));
    out.push_str(&format!("  postOrder:    {}\n", fmt_nodes(&post_order(gr))));
    out.push_str(&format!("  revPostOrder: {}\n", fmt_nodes(&rev_post_order(gr))));
    out.push_str(&format!("  revPreOrder:  {}\n", fmt_nodes(&rev_pre_order(gr))));
    out.push_str(&format!("  dominators:   {}\n", fmt_dom_map(&dom_map)));
    out.push_str(&format!(
        "  iDominators:  {}\n",
        fmt_pairs(i_dominators(gr).iter().map(|(s, t)| (s.index(), t.index())))
    ));
    out.push_str(&format!("  lva:          {}\n", fmt_in_out(&lva, fmt_name_set)));
    out.push_str(&format!("  rd:           {}\n", fmt_in_out(&rd, fmt_label_set)));
    out.push_str(&format!(
        "  backEdges:    {}\n",
        fmt_pairs(bedges.iter().map(|(s, t)| (s.index(), t.index())))
    ));
    out.push_str(&format!("  topsort:      {}\n", fmt_nodes(&topsort(gr))));
    out.push_str(&format!("  scc:          {}\n", fmt_components(&sccs(gr))));
    out.push_str(&format!(
        "  loopNodes:    {}\n",
        fmt_node_set_list(&loop_nodes(&bedges, gr))
    ));
    out.push_str(&format!("  duMap:        {}\n", fmt_label_map(&du)));
    out.push_str(&format!("  udMap:        {}\n", fmt_label_map(&ud)));
    out.push_str(&format!("  flowsTo:      {}\n", fmt_flows(&flows)));
}

fn fmt_nodes(ns: &[NodeIndex]) -> String {
    let items: Vec<String> = ns.iter().map(|n| n.index().to_string()).collect();
    format!("[{}]", items.join(", "))
}

fn fmt_name_set(s: &AHashSet<String>) -> String {
    let sorted: BTreeSet<&str> = s.iter().map(String::as_str).collect();
    let items: Vec<&str> = sorted.into_iter().collect();
    format!("{{{}}}", items.join(", "))
}

fn fmt_label_set(s: &AHashSet<Label>) -> String {
    let sorted: BTreeSet<Label> = s.iter().copied().collect();
    let items: Vec<String> = sorted.into_iter().map(|l| l.to_string()).collect();
    format!("{{{}}}", items.join(", "))
}

fn fmt_node_set(s: &AHashSet<NodeIndex>) -> String {
    let sorted: BTreeSet<usize> = s.iter().map(|n| n.index()).collect();
    let items: Vec<String> = sorted.into_iter().map(|n| n.to_string()).collect();
    format!("{{{}}}", items.join(", "))
}

fn fmt_pairs(pairs: impl Iterator<Item = (usize, usize)>) -> String {
    let sorted: BTreeSet<(usize, usize)> = pairs.collect();
    let items: Vec<String> = sorted.into_iter().map(|(s, t)| format!("{s} -> {t}")).collect();
    format!("{{{}}}", items.join("; "))
}

fn fmt_dom_map(dm: &crate::graph::DomMap) -> String {
    let mut entries: Vec<(usize, String)> = dm.iter().map(|(n, ds)| (n.index(), fmt_node_set(ds))).collect();
    entries.sort_unstable_by_key(|&(n, _)| n);
    let items: Vec<String> = entries.into_iter().map(|(n, ds)| format!("{n} -> {ds}")).collect();
    format!("{{{}}}", items.join("; "))
}

fn fmt_in_out<T>(map: &InOutMap<T>, fmt: impl Fn(&T) -> String) -> String {
    let mut entries: Vec<(usize, String)> = map
        .iter()
        .map(|(n, (i, o))| (n.index(), format!("in {} out {}", fmt(i), fmt(o))))
        .collect();
    entries.sort_unstable_by_key(|&(n, _)| n);
    let items: Vec<String> = entries.into_iter().map(|(n, io)| format!("{n} -> {io}")).collect();
    format!("{{{}}}", items.join("; "))
}

fn fmt_call_map(cm: &CallMap) -> String {
    let mut entries: Vec<(&str, String)> = cm.iter().map(|(k, v)| (k.as_str(), fmt_name_set(v))).collect();
    entries.sort_unstable_by_key(|&(k, _)| k);
    let items: Vec<String> = entries.into_iter().map(|(k, v)| format!("{k} -> {v}")).collect();
    format!("{{{}}}", items.join("; "))
}

fn fmt_label_map(m: &DUMap) -> String {
    let mut entries: Vec<(Label, String)> = m.iter().map(|(l, s)| (*l, fmt_label_set(s))).collect();
    entries.sort_unstable_by_key(|&(l, _)| l);
    let items: Vec<String> = entries.into_iter().map(|(l, s)| format!("{l} -> {s}")).collect();
    format!("{{{}}}", items.join("; "))
}

fn fmt_components(comps: &[Vec<NodeIndex>]) -> String {
    let mut sets: Vec<String> = comps
        .iter()
        .map(|c| {
            let s: AHashSet<NodeIndex> = c.iter().copied().collect();
            fmt_node_set(&s)
        })
        .collect();
    sets.sort_unstable();
    format!("[{}]", sets.join(", "))
}

fn fmt_node_set_list(sets: &[AHashSet<NodeIndex>]) -> String {
    let items: Vec<String> = sets.iter().map(fmt_node_set).collect();
    format!("[{}]", items.join(", "))
}

fn fmt_flows(flows: &FlowsGraph) -> String {
    let mut nodes: Vec<Label> = flows.nodes().collect();
    nodes.sort_unstable();
    let mut items = Vec::new();
    for n in nodes {
        let succs: AHashSet<Label> = flows.neighbors(n).collect();
        if !succs.is_empty() {
            items.push(format!("{n} -> {}", fmt_label_set(&succs)));
        }
    }
    format!("{{{}}}", items.join("; "))
}
