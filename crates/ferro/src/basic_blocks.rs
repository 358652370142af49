use petgraph::graph::NodeIndex;
use smallvec::{SmallVec, smallvec};
use tracing::debug;

use crate::{
    analysis::{Analysis, BBGr, Label, pu_name},
    ast::{Block, BlockKind, ProgramFile, ProgramUnit, PuKind, StmtKind},
};

/// The set of nodes whose control falls through to whatever comes next.
type Frontier = SmallVec<[NodeIndex; 4]>;

/// Labels every AST-block with a file-unique integer and attaches a
/// basic-block graph to every executable program unit.
///
/// Node 0 of each graph is the entry, node 1 the exit; both are empty.
/// Straight-line statements are grouped into maximal basic blocks. A
/// control construct contributes a node holding the construct with its
/// sub-lists emptied, so its guard expressions stay visible to the dataflow
/// analyses while its body blocks get nodes of their own.
pub fn analyse_bblocks<A: Clone>(mut pf: ProgramFile<Analysis<A>>) -> ProgramFile<Analysis<A>> {
    let mut counter: Label = 1;
    for pu in &mut pf.program_units {
        analyse_unit(&mut counter, pu);
    }
    pf
}

fn analyse_unit<A: Clone>(counter: &mut Label, pu: &mut ProgramUnit<Analysis<A>>) {
    label_blocks(counter, &mut pu.body);
    if matches!(
        pu.kind,
        PuKind::Main { .. } | PuKind::Function { .. } | PuKind::Subroutine { .. }
    ) {
        let gr = build_graph(&pu.body);
        debug!(unit = %pu_name(pu), nodes = gr.node_count(), "built basic-block graph");
        pu.a.bblocks = Some(Box::new(gr));
    }
    for sub in &mut pu.contained {
        analyse_unit(counter, sub);
    }
}

fn label_blocks<A>(counter: &mut Label, blocks: &mut [Block<Analysis<A>>]) {
    for b in blocks {
        b.a.ins_label = Some(*counter);
        *counter += 1;
        match &mut b.kind {
            BlockKind::Statement(_) => {}
            BlockKind::If { clauses, else_blocks } => {
                for c in clauses.iter_mut() {
                    label_blocks(counter, &mut c.blocks);
                }
                if let Some(bs) = else_blocks {
                    label_blocks(counter, bs);
                }
            }
            BlockKind::Do { body, .. } | BlockKind::DoWhile { body, .. } => label_blocks(counter, body),
        }
    }
}

fn build_graph<A: Clone>(body: &[Block<Analysis<A>>]) -> BBGr<Analysis<A>> {
    let mut gr = BBGr::new();
    let entry = gr.add_node(vec![]);
    let exit = gr.add_node(vec![]);
    let mut builder = GraphBuilder { gr, exit };
    let frontier = builder.build_seq(body, smallvec![entry]);
    for n in frontier {
        builder.gr.add_edge(n, exit);
    }
    builder.gr
}

struct GraphBuilder<A> {
    gr: BBGr<Analysis<A>>,
    exit: NodeIndex,
}

impl<A: Clone> GraphBuilder<A> {
    fn build_seq(&mut self, blocks: &[Block<Analysis<A>>], mut preds: Frontier) -> Frontier {
        let mut acc: Vec<Block<Analysis<A>>> = Vec::new();
        for b in blocks {
            match &b.kind {
                BlockKind::Statement(st) => {
                    acc.push(b.clone());
                    if matches!(st.kind, StmtKind::Return { .. }) {
                        preds = self.flush(&mut acc, preds);
                        for &n in &preds {
                            self.gr.add_edge(n, self.exit);
                        }
                        // nothing falls through a return
                        preds = SmallVec::new();
                    }
                }
                BlockKind::If { clauses, else_blocks } => {
                    preds = self.flush(&mut acc, preds);
                    let guard = self.gr.add_node(vec![strip_construct(b)]);
                    for &p in &preds {
                        self.gr.add_edge(p, guard);
                    }
                    let mut join: Frontier = SmallVec::new();
                    for c in clauses {
                        join.extend(self.build_seq(&c.blocks, smallvec![guard]));
                    }
                    match else_blocks {
                        Some(bs) => join.extend(self.build_seq(bs, smallvec![guard])),
                        // without an else arm the guard itself falls through
                        None => join.push(guard),
                    }
                    preds = join;
                }
                BlockKind::Do { body, .. } | BlockKind::DoWhile { body, .. } => {
                    preds = self.flush(&mut acc, preds);
                    let header = self.gr.add_node(vec![strip_construct(b)]);
                    for &p in &preds {
                        self.gr.add_edge(p, header);
                    }
                    let body_exits = self.build_seq(body, smallvec![header]);
                    for e in body_exits {
                        self.gr.add_edge(e, header);
                    }
                    preds = smallvec![header];
                }
            }
        }
        self.flush(&mut acc, preds)
    }

    fn flush(&mut self, acc: &mut Vec<Block<Analysis<A>>>, preds: Frontier) -> Frontier {
        if acc.is_empty() {
            return preds;
        }
        let node = self.gr.add_node(std::mem::take(acc));
        for &p in &preds {
            self.gr.add_edge(p, node);
        }
        smallvec![node]
    }
}

// The graph copy of a construct keeps its guard expressions and label but
// drops its sub-lists; those blocks get graph nodes of their own.
fn strip_construct<A: Clone>(b: &Block<Analysis<A>>) -> Block<Analysis<A>> {
    let mut c = b.clone();
    match &mut c.kind {
        BlockKind::Statement(_) => {}
        BlockKind::If { clauses, else_blocks } => {
            for cl in clauses.iter_mut() {
                cl.blocks = Vec::new();
            }
            if let Some(bs) = else_blocks {
                bs.clear();
            }
        }
        BlockKind::Do { body, .. } | BlockKind::DoWhile { body, .. } => body.clear(),
    }
    c
}
