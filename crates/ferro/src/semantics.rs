use ahash::AHashSet;

use crate::{
    analysis::{Analysis, var_name},
    ast::{Block, BlockKind, DoSpec, ExprKind, Expression, Name, Statement, StmtKind, Value},
    traverse::Traverse,
};

/// True when `e` can syntactically appear in an assignment position: a
/// variable reference or a subscript access.
pub fn is_lexpr<A>(e: &Expression<A>) -> bool {
    matches!(&e.kind, ExprKind::Value(Value::Variable(_)) | ExprKind::Subscript { .. })
}

/// Every variable or array name appearing anywhere within `x`.
pub fn all_vars<A, T: Traverse<A> + ?Sized>(x: &T) -> Vec<Name> {
    x.all_exprs()
        .into_iter()
        .filter_map(|e| match &e.kind {
            ExprKind::Value(Value::Variable(v)) => Some(v.clone()),
            _ => None,
        })
        .collect()
}

/// Every expression that syntactically appears in an assignment position
/// within `x`: assignment targets, do-loop variables, and the l-expression
/// actuals of subroutine and function calls (call-by-reference arguments may
/// be written by the callee).
pub fn lhs_exprs<'a, A, T: Traverse<A> + ?Sized>(x: &'a T) -> Vec<&'a Expression<A>> {
    let mut out = Vec::new();
    for st in x.all_stmts() {
        out.extend(stmt_lhs_exprs(st));
    }
    for b in x.all_blocks() {
        if let BlockKind::Do { spec, .. } = &b.kind {
            out.push(&spec.var);
        }
    }
    out.extend(fncall_lexpr_args(x));
    out
}

fn stmt_lhs_exprs<'a, A>(st: &'a Statement<A>) -> Vec<&'a Expression<A>> {
    match &st.kind {
        StmtKind::Assign { target, .. } => vec![target],
        StmtKind::Call { args: Some(args), .. } => args.iter().filter(|e| is_lexpr(e)).collect(),
        _ => Vec::new(),
    }
}

fn fncall_lexpr_args<'a, A, T: Traverse<A> + ?Sized>(x: &'a T) -> Vec<&'a Expression<A>> {
    let mut out = Vec::new();
    for e in x.all_exprs() {
        if let ExprKind::FunctionCall { args: Some(args), .. } = &e.kind {
            out.extend(args.iter().filter(|e| is_lexpr(e)));
        }
    }
    out
}

/// Every variable or array name appearing in an assignment position within
/// `x`, via each node's unique name once renaming has run.
pub fn all_lhs_vars<A, T: Traverse<Analysis<A>> + ?Sized>(x: &T) -> Vec<Name> {
    lhs_names(&lhs_exprs(x))
}

fn lhs_names<A>(exprs: &[&Expression<Analysis<A>>]) -> Vec<Name> {
    exprs
        .iter()
        .filter_map(|e| match &e.kind {
            ExprKind::Value(Value::Variable(_)) => Some(var_name(e).to_owned()),
            ExprKind::Subscript { array, .. } => match &array.kind {
                ExprKind::Value(Value::Variable(_)) => Some(var_name(array).to_owned()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

/// Names *read* by AST-block `b`.
///
/// Guard-bearing constructs contribute only their guarding expressions;
/// declarations contribute nothing; a subscripted assignment target
/// contributes its subscript expressions but not the array itself.
pub fn block_var_uses<A>(b: &Block<Analysis<A>>) -> AHashSet<Name> {
    let mut uses = AHashSet::new();
    match &b.kind {
        BlockKind::Statement(st) => match &st.kind {
            StmtKind::Declaration { .. } => {}
            StmtKind::Assign { target, value } => {
                uses.extend(all_vars(value));
                uses.extend(subscript_index_vars(target));
            }
            _ => uses.extend(all_vars(st)),
        },
        BlockKind::Do { spec, .. } => {
            uses.extend(all_vars(&spec.initial));
            uses.extend(all_vars(&spec.limit));
            if let Some(step) = &spec.step {
                uses.extend(all_vars(step));
            }
            uses.extend(subscript_index_vars(&spec.var));
        }
        BlockKind::DoWhile { condition, .. } => uses.extend(all_vars(condition)),
        BlockKind::If { clauses, .. } => {
            for c in clauses {
                uses.extend(all_vars(&c.condition));
            }
        }
    }
    uses
}

fn subscript_index_vars<A>(target: &Expression<A>) -> Vec<Name> {
    match &target.kind {
        ExprKind::Subscript { indices, .. } => all_vars(indices.as_slice()),
        _ => Vec::new(),
    }
}

/// Names *written* by AST-block `b`: the assignment-position names of a
/// statement block, the loop variable of a counted do, nothing otherwise.
pub fn block_var_defs<A>(b: &Block<Analysis<A>>) -> AHashSet<Name> {
    match &b.kind {
        BlockKind::Statement(st) => all_lhs_vars(st).into_iter().collect(),
        BlockKind::Do { spec, .. } => do_spec_defs(spec).into_iter().collect(),
        _ => AHashSet::new(),
    }
}

fn do_spec_defs<A>(spec: &DoSpec<Analysis<A>>) -> Vec<Name> {
    let mut exprs: Vec<&Expression<Analysis<A>>> = vec![&spec.var];
    exprs.extend(fncall_lexpr_args(spec));
    lhs_names(&exprs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SrcSpan;

    type E = Expression<Analysis<()>>;

    fn var(n: &str) -> E {
        Expression {
            a: Analysis::new(()),
            span: SrcSpan::initial(),
            kind: ExprKind::Value(Value::Variable(n.to_owned())),
        }
    }

    fn subscript(base: &str, index: E) -> E {
        Expression {
            a: Analysis::new(()),
            span: SrcSpan::initial(),
            kind: ExprKind::Subscript {
                array: Box::new(var(base)),
                indices: vec![index],
            },
        }
    }

    fn stmt_block(kind: StmtKind<Analysis<()>>) -> Block<Analysis<()>> {
        Block {
            a: Analysis::new(()),
            span: SrcSpan::initial(),
            kind: BlockKind::Statement(Statement {
                a: Analysis::new(()),
                span: SrcSpan::initial(),
                kind,
            }),
        }
    }

    #[test]
    fn subscripted_assignment_defines_array_uses_indices() {
        // v(i) = x
        let b = stmt_block(StmtKind::Assign {
            target: subscript("v", var("i")),
            value: var("x"),
        });
        let uses = block_var_uses(&b);
        assert!(uses.contains("i") && uses.contains("x") && !uses.contains("v"));
        let defs = block_var_defs(&b);
        assert!(defs.contains("v") && defs.len() == 1);
    }

    #[test]
    fn call_lexpr_actuals_count_as_defs_and_uses() {
        // call foo(y, 1)
        let b = stmt_block(StmtKind::Call {
            callee: Expression {
                a: Analysis::new(()),
                span: SrcSpan::initial(),
                kind: ExprKind::Value(Value::SubroutineName("foo".to_owned())),
            },
            args: Some(vec![
                var("y"),
                Expression {
                    a: Analysis::new(()),
                    span: SrcSpan::initial(),
                    kind: ExprKind::Value(Value::Integer("1".to_owned())),
                },
            ]),
        });
        assert!(block_var_defs(&b).contains("y"));
        assert!(block_var_uses(&b).contains("y"));
    }

    #[test]
    fn declarations_neither_use_nor_define() {
        let b = stmt_block(StmtKind::Declaration {
            base_type: crate::ast::BaseType::Integer,
            declarators: vec![crate::ast::Declarator {
                a: Analysis::new(()),
                span: SrcSpan::initial(),
                var: var("i"),
                dims: None,
                init: None,
            }],
        });
        assert!(block_var_uses(&b).is_empty());
        assert!(block_var_defs(&b).is_empty());
    }
}
