use std::fmt;

use ahash::AHashMap;
use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::ast::{
    BaseType, Block, ExprKind, Expression, Name, ProgramFile, ProgramUnit, SrcSpan, UniqueName, Value,
};

/// File-unique integer label attached to every AST-block by the basic-block
/// pass. Dataflow relations are keyed by these.
pub type Label = u32;

/// A basic block: a maximal straight-line sequence of AST-blocks.
pub type BB<A> = Vec<Block<A>>;

/// Mapping from a module-local name to its unique name, recorded on module
/// program units so USE-style imports can be resolved by later passes.
pub type ModuleEnv = AHashMap<Name, UniqueName>;

/// The basic-block control-flow graph of one program unit.
///
/// Node 0 is the entry. The graph lives inside the unit's annotation and is
/// treated as an opaque leaf by structural traversal: walking an AST never
/// descends into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BBGr<A> {
    graph: DiGraph<BB<A>, ()>,
}

impl<A> BBGr<A> {
    pub fn new() -> Self {
        Self { graph: DiGraph::new() }
    }

    /// The entry node. Only meaningful once at least one node exists.
    pub fn entry(&self) -> NodeIndex {
        NodeIndex::new(0)
    }

    pub fn add_node(&mut self, bb: BB<A>) -> NodeIndex {
        self.graph.add_node(bb)
    }

    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex) {
        self.graph.add_edge(source, target, ());
    }

    pub fn bb(&self, n: NodeIndex) -> &BB<A> {
        &self.graph[n]
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn successors(&self, n: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(n, Direction::Outgoing)
    }

    pub fn predecessors(&self, n: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(n, Direction::Incoming)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// The underlying petgraph graph, for running graph algorithms directly.
    pub fn graph(&self) -> &DiGraph<BB<A>, ()> {
        &self.graph
    }
}

impl<A> Default for BBGr<A> {
    fn default() -> Self {
        Self::new()
    }
}

// Graph equality is structural: same nodes in index order, same edge set.
impl<A: PartialEq> PartialEq for BBGr<A> {
    fn eq(&self, other: &Self) -> bool {
        if self.graph.node_count() != other.graph.node_count()
            || self.graph.edge_count() != other.graph.edge_count()
        {
            return false;
        }
        if !self.graph.node_indices().all(|i| self.graph[i] == other.graph[i]) {
            return false;
        }
        let edge_set = |g: &DiGraph<BB<A>, ()>| {
            let mut es: Vec<(usize, usize)> = g
                .edge_references()
                .map(|e| (e.source().index(), e.target().index()))
                .collect();
            es.sort_unstable();
            es
        };
        edge_set(&self.graph) == edge_set(&other.graph)
    }
}

/// Classification of an identifier, attached by the renamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ConstructType {
    Function,
    Subroutine,
    Variable,
    Array,
    Parameter,
}

/// An identifier's declared base type (when known) and construct class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdType {
    pub base: Option<BaseType>,
    pub construct: ConstructType,
}

/// Analysis metadata layered over the caller's original annotation.
///
/// [`init_analysis`] fills `prev` and leaves every other slot empty; the
/// renamer and basic-block passes extend the slots in place, and
/// [`strip_analysis`] recovers the original annotation exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis<A> {
    /// The caller's annotation, preserved verbatim.
    pub prev: A,
    /// Unique name of a variable reference or program-unit header, set by the
    /// renamer.
    pub unique_name: Option<UniqueName>,
    /// Basic-block graph, set on program units by the basic-block pass.
    pub bblocks: Option<Box<BBGr<Analysis<A>>>>,
    /// File-unique label, set on AST-blocks by the basic-block pass.
    pub ins_label: Option<Label>,
    /// Module-local renaming environment, set on module units by the renamer.
    pub module_env: Option<ModuleEnv>,
    /// Identifier classification, set on declarations and unit headers by the
    /// renamer.
    pub id_type: Option<IdType>,
}

impl<A> Analysis<A> {
    pub fn new(prev: A) -> Self {
        Self {
            prev,
            unique_name: None,
            bblocks: None,
            ins_label: None,
            module_env: None,
            id_type: None,
        }
    }
}

/// Wraps every annotation in the file with an empty [`Analysis`] layer.
pub fn init_analysis<A>(pf: ProgramFile<A>) -> ProgramFile<Analysis<A>> {
    pf.map_annotation(&mut Analysis::new)
}

/// Discards the analysis layer, recovering the original annotations.
///
/// Inverse of [`init_analysis`]: `strip_analysis(init_analysis(pf)) == pf`
/// for every AST.
pub fn strip_analysis<A>(pf: ProgramFile<Analysis<A>>) -> ProgramFile<A> {
    pf.map_annotation(&mut |an| an.prev)
}

/// The name of a variable expression: its unique name once renamed, otherwise
/// its source spelling.
///
/// # Panics
///
/// Panics when `e` is not a variable reference; callers own that invariant.
pub fn var_name<A>(e: &Expression<Analysis<A>>) -> &str {
    match &e.kind {
        ExprKind::Value(Value::Variable(v)) => e.a.unique_name.as_deref().unwrap_or(v),
        _ => panic!("var_name: expression at {:?} is not a variable", e.span),
    }
}

/// Synthesizes a variable expression whose source and unique name are both
/// `name`, reusing an existing annotation for the `prev` slot.
pub fn gen_var<A>(a: Analysis<A>, span: SrcSpan, name: impl Into<Name>) -> Expression<Analysis<A>> {
    let name = name.into();
    Expression {
        a: Analysis {
            unique_name: Some(name.clone()),
            ..a
        },
        span,
        kind: ExprKind::Value(Value::Variable(name)),
    }
}

/// The program unit's unique name when renaming has occurred, else its
/// source-level name.
pub fn pu_name<A>(pu: &ProgramUnit<Analysis<A>>) -> String {
    pu.a
        .unique_name
        .clone()
        .unwrap_or_else(|| pu.kind.unit_name().to_string())
}

/// Failures surfaced by the analysis pipeline.
///
/// These indicate AST shapes the engine does not handle; no recovery is
/// attempted and no partial results are returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisError {
    /// A declarator whose bound entity is not a recognizable variable.
    UnsupportedDeclarator { span: SrcSpan, found: String },
}

impl AnalysisError {
    pub(crate) fn unsupported_declarator(span: SrcSpan, found: impl Into<String>) -> Self {
        Self::UnsupportedDeclarator {
            span,
            found: found.into(),
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDeclarator { span, found } => {
                write!(
                    f,
                    "unsupported declarator at {}:{}: expected a variable, found {found}",
                    span.start.line, span.start.column
                )
            }
        }
    }
}

impl std::error::Error for AnalysisError {}
