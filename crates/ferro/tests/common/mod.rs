#![allow(dead_code)]

use ferro::{
    Analysis, BaseType, BinaryOp, Block, BlockKind, BlockMap, DoSpec, Declarator, ExprKind, Expression, IfClause,
    Label, MetaInfo, BBGr, ProgramFile, ProgramUnit, PuKind, SrcSpan, Statement, StmtKind, Value,
};

pub fn sp() -> SrcSpan {
    SrcSpan::initial()
}

pub fn var(n: &str) -> Expression<()> {
    Expression {
        a: (),
        span: sp(),
        kind: ExprKind::Value(Value::Variable(n.to_owned())),
    }
}

pub fn int(s: &str) -> Expression<()> {
    Expression {
        a: (),
        span: sp(),
        kind: ExprKind::Value(Value::Integer(s.to_owned())),
    }
}

pub fn binary(op: BinaryOp, l: Expression<()>, r: Expression<()>) -> Expression<()> {
    Expression {
        a: (),
        span: sp(),
        kind: ExprKind::Binary {
            op,
            left: Box::new(l),
            right: Box::new(r),
        },
    }
}

pub fn subscript(base: &str, indices: Vec<Expression<()>>) -> Expression<()> {
    Expression {
        a: (),
        span: sp(),
        kind: ExprKind::Subscript {
            array: Box::new(var(base)),
            indices,
        },
    }
}

pub fn fcall(name: &str, args: Vec<Expression<()>>) -> Expression<()> {
    Expression {
        a: (),
        span: sp(),
        kind: ExprKind::FunctionCall {
            function: Box::new(Expression {
                a: (),
                span: sp(),
                kind: ExprKind::Value(Value::FunctionName(name.to_owned())),
            }),
            args: Some(args),
        },
    }
}

pub fn stmt_block(kind: StmtKind<()>) -> Block<()> {
    Block {
        a: (),
        span: sp(),
        kind: BlockKind::Statement(Statement { a: (), span: sp(), kind }),
    }
}

pub fn assign(target: Expression<()>, value: Expression<()>) -> Block<()> {
    stmt_block(StmtKind::Assign { target, value })
}

pub fn print_of(args: Vec<Expression<()>>) -> Block<()> {
    stmt_block(StmtKind::Print { args })
}

pub fn call_stmt(name: &str, args: Option<Vec<Expression<()>>>) -> Block<()> {
    stmt_block(StmtKind::Call {
        callee: Expression {
            a: (),
            span: sp(),
            kind: ExprKind::Value(Value::SubroutineName(name.to_owned())),
        },
        args,
    })
}

pub fn scalar_decl(n: &str) -> Declarator<()> {
    Declarator {
        a: (),
        span: sp(),
        var: var(n),
        dims: None,
        init: None,
    }
}

pub fn array_decl(n: &str, dim: Expression<()>) -> Declarator<()> {
    Declarator {
        a: (),
        span: sp(),
        var: var(n),
        dims: Some(vec![dim]),
        init: None,
    }
}

pub fn declaration(base_type: BaseType, declarators: Vec<Declarator<()>>) -> Block<()> {
    stmt_block(StmtKind::Declaration { base_type, declarators })
}

pub fn if_block(condition: Expression<()>, then_blocks: Vec<Block<()>>, else_blocks: Option<Vec<Block<()>>>) -> Block<()> {
    Block {
        a: (),
        span: sp(),
        kind: BlockKind::If {
            clauses: vec![IfClause {
                condition,
                blocks: then_blocks,
            }],
            else_blocks,
        },
    }
}

pub fn do_while(condition: Expression<()>, body: Vec<Block<()>>) -> Block<()> {
    Block {
        a: (),
        span: sp(),
        kind: BlockKind::DoWhile { condition, body },
    }
}

pub fn counted_do(loop_var: &str, initial: Expression<()>, limit: Expression<()>, body: Vec<Block<()>>) -> Block<()> {
    Block {
        a: (),
        span: sp(),
        kind: BlockKind::Do {
            spec: DoSpec {
                a: (),
                span: sp(),
                var: var(loop_var),
                initial,
                limit,
                step: None,
            },
            body,
        },
    }
}

pub fn subroutine(name: &str, args: &[&str], body: Vec<Block<()>>) -> ProgramUnit<()> {
    ProgramUnit {
        a: (),
        span: sp(),
        kind: PuKind::Subroutine {
            name: name.to_owned(),
            args: args.iter().map(|a| (*a).to_owned()).collect(),
        },
        body,
        contained: vec![],
    }
}

pub fn function(name: &str, args: &[&str], result: Option<&str>, body: Vec<Block<()>>) -> ProgramUnit<()> {
    ProgramUnit {
        a: (),
        span: sp(),
        kind: PuKind::Function {
            name: name.to_owned(),
            args: args.iter().map(|a| (*a).to_owned()).collect(),
            result: result.map(str::to_owned),
            return_type: Some(BaseType::Integer),
        },
        body,
        contained: vec![],
    }
}

pub fn module_unit(name: &str, body: Vec<Block<()>>, contained: Vec<ProgramUnit<()>>) -> ProgramUnit<()> {
    ProgramUnit {
        a: (),
        span: sp(),
        kind: PuKind::Module { name: name.to_owned() },
        body,
        contained,
    }
}

pub fn main_named(name: &str, body: Vec<Block<()>>) -> ProgramUnit<()> {
    ProgramUnit {
        a: (),
        span: sp(),
        kind: PuKind::Main {
            name: Some(name.to_owned()),
        },
        body,
        contained: vec![],
    }
}

pub fn pf(units: Vec<ProgramUnit<()>>) -> ProgramFile<()> {
    ProgramFile {
        a: (),
        meta: MetaInfo {
            filename: "test.f90".to_owned(),
        },
        program_units: units,
    }
}

/// Wraps a bare block in the analysis layer and stamps its label, the way
/// the basic-block pass would.
pub fn labeled(b: Block<()>, label: Label) -> Block<Analysis<()>> {
    let mut b = b.map_annotation(&mut Analysis::new);
    b.a.ins_label = Some(label);
    b
}

/// A block map over the blocks of a hand-built graph.
pub fn block_map_of(gr: &BBGr<Analysis<()>>) -> BlockMap<'_, ()> {
    let mut bm = BlockMap::new();
    for n in gr.node_indices() {
        for b in gr.bb(n) {
            bm.insert(b.a.ins_label.expect("test blocks are labeled"), b);
        }
    }
    bm
}
