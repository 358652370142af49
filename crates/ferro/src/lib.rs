#![doc = include_str!("../../../README.md")]

/// Node identifier of the basic-block graphs, re-exported from petgraph.
pub use petgraph::graph::NodeIndex;

mod analysis;
mod ast;
mod basic_blocks;
mod dataflow;
mod graph;
mod renamer;
mod report;
mod semantics;
mod solver;
mod traverse;

pub use crate::{
    analysis::{
        Analysis, AnalysisError, BB, BBGr, ConstructType, IdType, Label, ModuleEnv, gen_var, init_analysis, pu_name,
        strip_analysis, var_name,
    },
    ast::{
        Annotated, BaseType, BinaryOp, Block, BlockKind, Declarator, DoSpec, ExprKind, Expression, IfClause,
        MetaInfo, Name, Position, ProgramFile, ProgramUnit, ProgramUnitName, PuKind, SrcSpan, Statement, StmtKind,
        UnaryOp, UniqueName, Value,
    },
    basic_blocks::analyse_bblocks,
    dataflow::{
        BackEdgeMap, BlockMap, CallMap, DUMap, DefMap, FlowsGraph, UDMap, gen_back_edge_map, gen_block_map,
        gen_call_map, gen_def_map, gen_du_map, gen_flows_to_graph, gen_ud_map, live_variable_analysis, loop_nodes,
        reaching_definitions,
    },
    graph::{
        DomMap, IDomMap, dominators, i_dominators, post_order, pre_order, rev_post_order, rev_pre_order, sccs,
        topsort, transitive_closure,
    },
    renamer::{Env, RenameState, rename, unrename},
    report::show_data_flow,
    semantics::{all_lhs_vars, all_vars, block_var_defs, block_var_uses, is_lexpr, lhs_exprs},
    solver::{InOutMap, dataflow_solver},
    traverse::Traverse,
};
