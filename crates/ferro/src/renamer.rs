use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    analysis::{Analysis, AnalysisError, ConstructType, IdType, ModuleEnv},
    ast::{
        Block, BlockKind, ExprKind, Expression, Name, ProgramFile, ProgramUnit, PuKind, Statement, StmtKind,
        UniqueName, Value,
    },
    traverse::Traverse,
};

/// A renaming environment: source name to unique name, one per open scope.
pub type Env = AHashMap<Name, UniqueName>;

/// Renamer state visible to callers once a run has finished.
///
/// A balanced run leaves `scope_stack` at the root sentinel and `env_stack`
/// at a single empty environment. `name_map` records every binding the run
/// created and is what [`unrename`] consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameState {
    pub scope_stack: Vec<String>,
    pub env_stack: Vec<Env>,
    /// Unique name back to the source spelling it replaced.
    pub name_map: AHashMap<UniqueName, Name>,
}

struct RenameCtx {
    scope_stack: Vec<String>,
    uniq_seq: u64,
    env_stack: Vec<Env>,
    name_map: AHashMap<UniqueName, Name>,
}

impl RenameCtx {
    fn new() -> Self {
        Self {
            scope_stack: vec!["_".to_owned()],
            uniq_seq: 1,
            env_stack: vec![Env::new()],
            name_map: AHashMap::new(),
        }
    }

    fn fresh(&mut self) -> u64 {
        let k = self.uniq_seq;
        self.uniq_seq += 1;
        k
    }

    fn scope(&self) -> &str {
        self.scope_stack.last().expect("scope stack holds at least the root sentinel")
    }
}

/// Assigns a unique name to every program unit and variable binding in the
/// file, rewriting variable references to their unique names.
///
/// The result is semantically equivalent to the input: spellings change,
/// structure does not. Unique names start with `_`, which no legal Fortran
/// identifier does, so a second run leaves the file untouched and collision
/// with source identifiers is impossible by construction.
pub fn rename<A>(
    mut pf: ProgramFile<Analysis<A>>,
) -> Result<(ProgramFile<Analysis<A>>, RenameState), AnalysisError> {
    let mut ctx = RenameCtx::new();
    for pu in &mut pf.program_units {
        rename_program_unit(&mut ctx, pu)?;
    }
    let state = RenameState {
        scope_stack: ctx.scope_stack,
        env_stack: ctx.env_stack,
        name_map: ctx.name_map,
    };
    Ok((pf, state))
}

/// Restores the source spelling of every renamed variable reference, using
/// the `name_map` accumulated by [`rename`].
pub fn unrename<A>(mut pf: ProgramFile<Analysis<A>>, state: &RenameState) -> ProgramFile<Analysis<A>> {
    pf.try_map_exprs(&mut |e| {
        if let ExprKind::Value(Value::Variable(v)) = &mut e.kind
            && let Some(src) = state.name_map.get(v.as_str())
        {
            *v = src.clone();
            e.a.unique_name = None;
        }
        Ok(())
    })
    .expect("restoring spellings cannot fail");
    pf
}

fn rename_program_unit<A>(ctx: &mut RenameCtx, pu: &mut ProgramUnit<Analysis<A>>) -> Result<(), AnalysisError> {
    let k = ctx.fresh();
    let unit_name = format!("{}_{}{}", ctx.scope(), pu.kind.unit_name(), k);
    ctx.name_map.insert(unit_name.clone(), pu.kind.unit_name().to_string());

    // the scope is released on every exit path, including failure
    ctx.scope_stack.push(unit_name.clone());
    let res = rename_unit_interior(ctx, pu, &unit_name);
    ctx.scope_stack.pop();
    let module_env = res?;

    pu.a.unique_name = Some(unit_name.clone());
    if let Some(env) = module_env {
        // merge, so re-running the renamer cannot erase a recorded module
        // environment
        let slot = pu.a.module_env.get_or_insert_with(ModuleEnv::new);
        for (k, v) in env {
            slot.entry(k).or_insert(v);
        }
    }
    pu.a.id_type = match &pu.kind {
        PuKind::Function { return_type, .. } => Some(IdType {
            base: *return_type,
            construct: ConstructType::Function,
        }),
        PuKind::Subroutine { .. } => Some(IdType {
            base: None,
            construct: ConstructType::Subroutine,
        }),
        _ => None,
    };
    debug!(unit = %unit_name, "renamed program unit");
    Ok(())
}

// Everything that happens between entering and leaving the unit's scope.
fn rename_unit_interior<A>(
    ctx: &mut RenameCtx,
    pu: &mut ProgramUnit<Analysis<A>>,
    unit_name: &str,
) -> Result<Option<ModuleEnv>, AnalysisError> {
    // Formal parameters, plus the result binding of a function: a write to
    // the function (or result) name inside the body is a write to the
    // unit's return value, so it maps to the unit's own unique name.
    let arg_env = match &pu.kind {
        PuKind::Function { name, args, result, .. } => {
            let mut env = bind_args(ctx, unit_name, args);
            let result_name = result.clone().unwrap_or_else(|| name.clone());
            env.insert(result_name, unit_name.to_owned());
            Some(env)
        }
        PuKind::Subroutine { args, .. } if !args.is_empty() => Some(bind_args(ctx, unit_name, args)),
        _ => None,
    };
    if let Some(env) = arg_env {
        ctx.env_stack.push(env);
        let res = rewrite_region(ctx, &mut pu.body);
        ctx.env_stack.pop();
        res?;
    }

    let mut module_env = matches!(pu.kind, PuKind::Module { .. }).then(ModuleEnv::new);
    rename_block_list(ctx, &mut pu.body, module_env.as_mut())?;

    for sub in &mut pu.contained {
        rename_program_unit(ctx, sub)?;
    }
    Ok(module_env)
}

fn bind_args(ctx: &mut RenameCtx, unit_name: &str, args: &[Name]) -> Env {
    let mut env = Env::new();
    for v in args {
        let u = format!("{}_{}{}", unit_name, v, ctx.fresh());
        trace!(source = %v, unique = %u, "bound argument");
        ctx.name_map.insert(u.clone(), v.clone());
        env.insert(v.clone(), u);
    }
    env
}

// Declaration scoping walks nested block lists bottom-up; within one list,
// each declaration statement opens a scope that covers its own suffix of the
// list. Suffixes are handled innermost-first so that shadowing declarations
// win and the `_` guard keeps their references stable.
fn rename_block_list<A>(
    ctx: &mut RenameCtx,
    blocks: &mut [Block<Analysis<A>>],
    mut capture: Option<&mut ModuleEnv>,
) -> Result<(), AnalysisError> {
    for b in blocks.iter_mut() {
        match &mut b.kind {
            BlockKind::If { clauses, else_blocks } => {
                for c in clauses.iter_mut() {
                    rename_block_list(ctx, &mut c.blocks, None)?;
                }
                if let Some(bs) = else_blocks {
                    rename_block_list(ctx, bs, None)?;
                }
            }
            BlockKind::Do { body, .. } | BlockKind::DoWhile { body, .. } => {
                rename_block_list(ctx, body, None)?;
            }
            BlockKind::Statement(_) => {}
        }
    }

    for i in (0..blocks.len()).rev() {
        let env = match &mut blocks[i].kind {
            BlockKind::Statement(Statement {
                kind: StmtKind::Declaration { base_type, declarators },
                ..
            }) => {
                let base_type = *base_type;
                let mut env = Env::new();
                for d in declarators.iter_mut() {
                    let v = match &d.var.kind {
                        ExprKind::Value(Value::Variable(v)) => v.clone(),
                        _ => {
                            return Err(AnalysisError::unsupported_declarator(d.span, expr_shape(&d.var)));
                        }
                    };
                    // The integer is consumed before the already-renamed
                    // guard so a second run sees the same sequence and
                    // reproduces identical unit names.
                    let k = ctx.fresh();
                    if v.starts_with('_') {
                        continue;
                    }
                    let u = format!("{}_{}_{}", ctx.scope(), v, k);
                    trace!(source = %v, unique = %u, "bound declared variable");
                    ctx.name_map.insert(u.clone(), v.clone());
                    d.var.a.id_type = Some(IdType {
                        base: Some(base_type),
                        construct: if d.dims.is_some() {
                            ConstructType::Array
                        } else {
                            ConstructType::Variable
                        },
                    });
                    env.insert(v, u);
                }
                env
            }
            _ => continue,
        };
        if env.is_empty() {
            continue;
        }
        if let Some(cap) = capture.as_deref_mut() {
            for (k, v) in &env {
                cap.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        ctx.env_stack.push(env);
        let res = rewrite_region(ctx, &mut blocks[i..]);
        ctx.env_stack.pop();
        res?;
    }
    Ok(())
}

// Variable rewrite: names already starting with `_` are unique names from an
// earlier pass and stay untouched; everything else is looked up in the
// innermost environment only. Nested scopes are entered with environments
// rebuilt from their visible declarations, so there is no chain walk.
fn rewrite_region<A>(
    ctx: &RenameCtx,
    region: &mut (impl Traverse<Analysis<A>> + ?Sized),
) -> Result<(), AnalysisError> {
    let env = ctx.env_stack.last().expect("environment stack holds at least the root sentinel");
    region.try_map_exprs(&mut |e| {
        if let ExprKind::Value(Value::Variable(v)) = &mut e.kind
            && !v.starts_with('_')
            && let Some(u) = env.get(v.as_str())
        {
            e.a.unique_name = Some(u.clone());
            *v = u.clone();
        }
        Ok(())
    })
}

fn expr_shape<A>(e: &Expression<A>) -> &'static str {
    match &e.kind {
        ExprKind::Value(Value::Variable(_)) => "variable",
        ExprKind::Value(_) => "literal value",
        ExprKind::Binary { .. } => "binary expression",
        ExprKind::Unary { .. } => "unary expression",
        ExprKind::Subscript { .. } => "subscript expression",
        ExprKind::FunctionCall { .. } => "function call",
    }
}
