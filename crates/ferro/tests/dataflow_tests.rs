mod common;

use ahash::AHashSet;
use common::{
    assign, binary, block_map_of, call_stmt, declaration, do_while, fcall, int, labeled, main_named, pf, print_of,
    scalar_decl, subroutine, var,
};
use ferro::{
    Analysis, BBGr, BaseType, BinaryOp, Label, NodeIndex, analyse_bblocks, dominators, gen_back_edge_map,
    gen_block_map, gen_call_map, gen_def_map, gen_du_map, gen_flows_to_graph, gen_ud_map, init_analysis,
    live_variable_analysis, loop_nodes, rename, reaching_definitions, show_data_flow,
};
use pretty_assertions::assert_eq;

fn ix(i: usize) -> NodeIndex {
    NodeIndex::new(i)
}

fn names(s: &AHashSet<String>) -> Vec<&str> {
    let mut v: Vec<&str> = s.iter().map(String::as_str).collect();
    v.sort_unstable();
    v
}

fn labels(s: &AHashSet<Label>) -> Vec<Label> {
    let mut v: Vec<Label> = s.iter().copied().collect();
    v.sort_unstable();
    v
}

fn node_set(s: &AHashSet<NodeIndex>) -> Vec<usize> {
    let mut v: Vec<usize> = s.iter().map(|n| n.index()).collect();
    v.sort_unstable();
    v
}

/// S3: linear graph `0 -> 1 -> 2`; block 0 `a := 1`, block 1 `b := a`,
/// block 2 uses `b`.
#[test]
fn live_variables_on_a_linear_graph() {
    let mut gr: BBGr<Analysis<()>> = BBGr::new();
    let n0 = gr.add_node(vec![labeled(assign(var("a"), int("1")), 1)]);
    let n1 = gr.add_node(vec![labeled(assign(var("b"), var("a")), 2)]);
    let n2 = gr.add_node(vec![labeled(print_of(vec![var("b")]), 3)]);
    gr.add_edge(n0, n1);
    gr.add_edge(n1, n2);

    let lva = live_variable_analysis(&gr);
    assert_eq!(names(&lva[&n0].0), Vec::<&str>::new());
    assert_eq!(names(&lva[&n1].0), vec!["a"]);
    assert_eq!(names(&lva[&n2].0), vec!["b"]);
    assert_eq!(names(&lva[&n0].1), vec!["a"]);
    assert_eq!(names(&lva[&n1].1), vec!["b"]);
    assert_eq!(names(&lva[&n2].1), Vec::<&str>::new());
}

/// S4: diamond `0 -> {1, 2} -> 3`; 0 defines `x` (label 10), 1 redefines it
/// (label 11), 2 is empty, 3 uses `x` (label 12).
#[test]
fn reaching_definitions_and_chains_on_a_diamond() {
    let mut gr: BBGr<Analysis<()>> = BBGr::new();
    let n0 = gr.add_node(vec![labeled(assign(var("x"), int("1")), 10)]);
    let n1 = gr.add_node(vec![labeled(assign(var("x"), int("2")), 11)]);
    let n2 = gr.add_node(vec![]);
    let n3 = gr.add_node(vec![labeled(assign(var("y"), var("x")), 12)]);
    gr.add_edge(n0, n1);
    gr.add_edge(n0, n2);
    gr.add_edge(n1, n3);
    gr.add_edge(n2, n3);

    let bm = block_map_of(&gr);
    let dm = gen_def_map(&bm);
    assert_eq!(labels(&dm["x"]), vec![10, 11]);

    let rd = reaching_definitions(&dm, &gr);
    assert_eq!(labels(&rd[&n3].0), vec![10, 11]);
    assert_eq!(labels(&rd[&n0].1), vec![10]);
    assert_eq!(labels(&rd[&n1].1), vec![11]);

    let du = gen_du_map(&bm, &dm, &gr, &rd);
    assert_eq!(labels(&du[&10]), vec![12]);
    assert_eq!(labels(&du[&11]), vec![12]);

    let ud = gen_ud_map(&du);
    assert_eq!(labels(&ud[&12]), vec![10, 11]);

    // duality: reversing twice is the identity
    assert_eq!(gen_ud_map(&gen_ud_map(&du)), du);

    // flows-to: reflexive and transitive over def-use reachability
    let flows = gen_flows_to_graph(&bm, &du);
    assert!(flows.contains_edge(10, 10));
    assert!(flows.contains_edge(10, 12));
    assert!(flows.contains_edge(11, 12));
    assert!(!flows.contains_edge(12, 10));
}

/// S5: `0 -> 1 -> 2 -> 1` has the single back edge `(2, 1)` and the natural
/// loop `{1, 2}`.
#[test]
fn back_edges_and_natural_loops() {
    let mut gr: BBGr<Analysis<()>> = BBGr::new();
    let n0 = gr.add_node(vec![]);
    let n1 = gr.add_node(vec![]);
    let n2 = gr.add_node(vec![]);
    gr.add_edge(n0, n1);
    gr.add_edge(n1, n2);
    gr.add_edge(n2, n1);

    let dom_map = dominators(&gr);
    assert_eq!(node_set(&dom_map[&n0]), vec![0]);
    assert_eq!(node_set(&dom_map[&n1]), vec![0, 1]);
    assert_eq!(node_set(&dom_map[&n2]), vec![0, 1, 2]);

    let bedges = gen_back_edge_map(&dom_map, &gr);
    assert_eq!(bedges.len(), 1);
    assert_eq!(bedges[&n2], n1);

    // characterization: an edge is a back edge exactly when its target
    // dominates its source
    for (s, t) in [(n0, n1), (n1, n2)] {
        assert!(!dom_map[&s].contains(&t) || bedges.get(&s) == Some(&t));
    }

    let loops = loop_nodes(&bedges, &gr);
    assert_eq!(loops.len(), 1);
    assert_eq!(node_set(&loops[0]), vec![1, 2]);
}

/// S6: `main` calls subroutine `foo` and references function `bar`; `foo`
/// calls nothing.
#[test]
fn call_map_collects_calls_and_function_references() {
    let file = pf(vec![
        main_named(
            "main",
            vec![
                call_stmt("foo", Some(vec![])),
                assign(var("x"), fcall("bar", vec![int("1")])),
            ],
        ),
        subroutine("foo", &[], vec![]),
    ]);
    let cm = gen_call_map(&init_analysis(file));
    assert_eq!(names(&cm["main"]), vec!["bar", "foo"]);
    assert_eq!(names(&cm["foo"]), Vec::<&str>::new());
}

/// Call statements without an argument list are accepted alongside the
/// empty-list form.
#[test]
fn call_map_accepts_argless_call_statements() {
    let file = pf(vec![main_named(
        "main",
        vec![call_stmt("setup", None), call_stmt("teardown", Some(vec![]))],
    )]);
    let cm = gen_call_map(&init_analysis(file));
    assert_eq!(names(&cm["main"]), vec!["setup", "teardown"]);
}

/// The whole pipeline: label, build graphs, rename, analyse, report.
#[test]
fn pipeline_on_a_looping_subroutine() {
    let file = pf(vec![subroutine(
        "loopy",
        &["n"],
        vec![
            declaration(BaseType::Integer, vec![scalar_decl("i")]),
            assign(var("i"), int("0")),
            do_while(
                binary(BinaryOp::Lt, var("i"), var("n")),
                vec![assign(var("i"), binary(BinaryOp::Add, var("i"), int("1")))],
            ),
            print_of(vec![var("i")]),
        ],
    )]);
    let analysed = analyse_bblocks(init_analysis(file));
    let (renamed, _) = rename(analysed).unwrap();

    let unit = &renamed.program_units[0];
    let gr = unit.a.bblocks.as_ref().expect("executable unit has a graph");

    // the do-while closes a loop
    let dom_map = dominators(gr);
    let bedges = gen_back_edge_map(&dom_map, gr);
    assert_eq!(bedges.len(), 1);
    let loops = loop_nodes(&bedges, gr);
    assert_eq!(loops.len(), 1);
    assert!(loops[0].len() >= 2);

    // liveness works over unique names after renaming
    let lva = live_variable_analysis(gr);
    let all_live: AHashSet<String> = lva.values().flat_map(|(i, _)| i.iter().cloned()).collect();
    assert!(all_live.iter().all(|v| v.starts_with('_')));
    assert!(all_live.iter().any(|v| v.starts_with("__loopy1_i_")));

    // reaching definitions see both writes to i
    let bm = gen_block_map(&renamed);
    let dm = gen_def_map(&bm);
    let i_defs = dm
        .iter()
        .find_map(|(v, ls)| v.starts_with("__loopy1_i_").then_some(ls))
        .expect("i is defined");
    assert_eq!(i_defs.len(), 2);

    let report = show_data_flow(&renamed);
    assert!(report.contains("ProgramUnit __loopy1"));
    assert!(report.contains("backEdges:    {"));
    assert!(report.contains("loopNodes:    [{"));
    assert!(report.contains("lva:"));
    assert!(report.contains("flowsTo:"));
}

/// Labels assigned by the basic-block pass are unique across the file.
#[test]
fn labels_are_unique_across_program_units() {
    let file = pf(vec![
        subroutine("a", &[], vec![assign(var("x"), int("1")), print_of(vec![var("x")])]),
        subroutine("b", &[], vec![assign(var("y"), int("2")), print_of(vec![var("y")])]),
    ]);
    let analysed = analyse_bblocks(init_analysis(file));
    let bm = gen_block_map(&analysed);
    assert_eq!(bm.len(), 4);
}
