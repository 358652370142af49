use crate::{
    analysis::AnalysisError,
    ast::{
        Block, BlockKind, Declarator, DoSpec, ExprKind, Expression, ProgramFile, ProgramUnit, Statement, StmtKind,
    },
};

/// Generic structural recursion over the AST.
///
/// `collect_*` gather every subterm of the chosen type, pre-order: parent
/// before child, left before right. `try_map_exprs` rewrites every expression
/// in place, children first, so a node is visited once after everything below
/// it. Annotations are opaque leaves: traversal never descends into the
/// analysis slots (in particular, not into a program unit's basic-block
/// graph).
pub trait Traverse<A> {
    fn collect_exprs<'s>(&'s self, out: &mut Vec<&'s Expression<A>>);
    fn collect_blocks<'s>(&'s self, out: &mut Vec<&'s Block<A>>);
    fn collect_stmts<'s>(&'s self, out: &mut Vec<&'s Statement<A>>);
    fn try_map_exprs(
        &mut self,
        f: &mut dyn FnMut(&mut Expression<A>) -> Result<(), AnalysisError>,
    ) -> Result<(), AnalysisError>;

    /// Every expression nested anywhere below (and including) this node.
    fn all_exprs(&self) -> Vec<&Expression<A>> {
        let mut out = Vec::new();
        self.collect_exprs(&mut out);
        out
    }

    /// Every AST-block nested anywhere below (and including) this node.
    fn all_blocks(&self) -> Vec<&Block<A>> {
        let mut out = Vec::new();
        self.collect_blocks(&mut out);
        out
    }

    /// Every statement nested anywhere below (and including) this node.
    fn all_stmts(&self) -> Vec<&Statement<A>> {
        let mut out = Vec::new();
        self.collect_stmts(&mut out);
        out
    }
}

impl<A, T: Traverse<A>> Traverse<A> for [T] {
    fn collect_exprs<'s>(&'s self, out: &mut Vec<&'s Expression<A>>) {
        for t in self {
            t.collect_exprs(out);
        }
    }

    fn collect_blocks<'s>(&'s self, out: &mut Vec<&'s Block<A>>) {
        for t in self {
            t.collect_blocks(out);
        }
    }

    fn collect_stmts<'s>(&'s self, out: &mut Vec<&'s Statement<A>>) {
        for t in self {
            t.collect_stmts(out);
        }
    }

    fn try_map_exprs(
        &mut self,
        f: &mut dyn FnMut(&mut Expression<A>) -> Result<(), AnalysisError>,
    ) -> Result<(), AnalysisError> {
        for t in self {
            t.try_map_exprs(f)?;
        }
        Ok(())
    }
}

impl<A, T: Traverse<A>> Traverse<A> for Vec<T> {
    fn collect_exprs<'s>(&'s self, out: &mut Vec<&'s Expression<A>>) {
        self.as_slice().collect_exprs(out);
    }

    fn collect_blocks<'s>(&'s self, out: &mut Vec<&'s Block<A>>) {
        self.as_slice().collect_blocks(out);
    }

    fn collect_stmts<'s>(&'s self, out: &mut Vec<&'s Statement<A>>) {
        self.as_slice().collect_stmts(out);
    }

    fn try_map_exprs(
        &mut self,
        f: &mut dyn FnMut(&mut Expression<A>) -> Result<(), AnalysisError>,
    ) -> Result<(), AnalysisError> {
        self.as_mut_slice().try_map_exprs(f)
    }
}

impl<A, T: Traverse<A>> Traverse<A> for Option<T> {
    fn collect_exprs<'s>(&'s self, out: &mut Vec<&'s Expression<A>>) {
        if let Some(t) = self {
            t.collect_exprs(out);
        }
    }

    fn collect_blocks<'s>(&'s self, out: &mut Vec<&'s Block<A>>) {
        if let Some(t) = self {
            t.collect_blocks(out);
        }
    }

    fn collect_stmts<'s>(&'s self, out: &mut Vec<&'s Statement<A>>) {
        if let Some(t) = self {
            t.collect_stmts(out);
        }
    }

    fn try_map_exprs(
        &mut self,
        f: &mut dyn FnMut(&mut Expression<A>) -> Result<(), AnalysisError>,
    ) -> Result<(), AnalysisError> {
        if let Some(t) = self {
            t.try_map_exprs(f)?;
        }
        Ok(())
    }
}

impl<A> Traverse<A> for ProgramFile<A> {
    fn collect_exprs<'s>(&'s self, out: &mut Vec<&'s Expression<A>>) {
        self.program_units.collect_exprs(out);
    }

    fn collect_blocks<'s>(&'s self, out: &mut Vec<&'s Block<A>>) {
        self.program_units.collect_blocks(out);
    }

    fn collect_stmts<'s>(&'s self, out: &mut Vec<&'s Statement<A>>) {
        self.program_units.collect_stmts(out);
    }

    fn try_map_exprs(
        &mut self,
        f: &mut dyn FnMut(&mut Expression<A>) -> Result<(), AnalysisError>,
    ) -> Result<(), AnalysisError> {
        self.program_units.try_map_exprs(f)
    }
}

impl<A> Traverse<A> for ProgramUnit<A> {
    fn collect_exprs<'s>(&'s self, out: &mut Vec<&'s Expression<A>>) {
        self.body.collect_exprs(out);
        self.contained.collect_exprs(out);
    }

    fn collect_blocks<'s>(&'s self, out: &mut Vec<&'s Block<A>>) {
        self.body.collect_blocks(out);
        self.contained.collect_blocks(out);
    }

    fn collect_stmts<'s>(&'s self, out: &mut Vec<&'s Statement<A>>) {
        self.body.collect_stmts(out);
        self.contained.collect_stmts(out);
    }

    fn try_map_exprs(
        &mut self,
        f: &mut dyn FnMut(&mut Expression<A>) -> Result<(), AnalysisError>,
    ) -> Result<(), AnalysisError> {
        self.body.try_map_exprs(f)?;
        self.contained.try_map_exprs(f)
    }
}

impl<A> Traverse<A> for Block<A> {
    fn collect_exprs<'s>(&'s self, out: &mut Vec<&'s Expression<A>>) {
        match &self.kind {
            BlockKind::Statement(st) => st.collect_exprs(out),
            BlockKind::If { clauses, else_blocks } => {
                for c in clauses {
                    c.condition.collect_exprs(out);
                    c.blocks.collect_exprs(out);
                }
                else_blocks.collect_exprs(out);
            }
            BlockKind::Do { spec, body } => {
                spec.collect_exprs(out);
                body.collect_exprs(out);
            }
            BlockKind::DoWhile { condition, body } => {
                condition.collect_exprs(out);
                body.collect_exprs(out);
            }
        }
    }

    fn collect_blocks<'s>(&'s self, out: &mut Vec<&'s Block<A>>) {
        out.push(self);
        match &self.kind {
            BlockKind::Statement(_) => {}
            BlockKind::If { clauses, else_blocks } => {
                for c in clauses {
                    c.blocks.collect_blocks(out);
                }
                else_blocks.collect_blocks(out);
            }
            BlockKind::Do { body, .. } | BlockKind::DoWhile { body, .. } => body.collect_blocks(out),
        }
    }

    fn collect_stmts<'s>(&'s self, out: &mut Vec<&'s Statement<A>>) {
        match &self.kind {
            BlockKind::Statement(st) => st.collect_stmts(out),
            BlockKind::If { clauses, else_blocks } => {
                for c in clauses {
                    c.blocks.collect_stmts(out);
                }
                else_blocks.collect_stmts(out);
            }
            BlockKind::Do { body, .. } | BlockKind::DoWhile { body, .. } => body.collect_stmts(out),
        }
    }

    fn try_map_exprs(
        &mut self,
        f: &mut dyn FnMut(&mut Expression<A>) -> Result<(), AnalysisError>,
    ) -> Result<(), AnalysisError> {
        match &mut self.kind {
            BlockKind::Statement(st) => st.try_map_exprs(f),
            BlockKind::If { clauses, else_blocks } => {
                for c in clauses {
                    c.condition.try_map_exprs(f)?;
                    c.blocks.try_map_exprs(f)?;
                }
                else_blocks.try_map_exprs(f)
            }
            BlockKind::Do { spec, body } => {
                spec.try_map_exprs(f)?;
                body.try_map_exprs(f)
            }
            BlockKind::DoWhile { condition, body } => {
                condition.try_map_exprs(f)?;
                body.try_map_exprs(f)
            }
        }
    }
}

impl<A> Traverse<A> for DoSpec<A> {
    fn collect_exprs<'s>(&'s self, out: &mut Vec<&'s Expression<A>>) {
        self.var.collect_exprs(out);
        self.initial.collect_exprs(out);
        self.limit.collect_exprs(out);
        self.step.collect_exprs(out);
    }

    fn collect_blocks<'s>(&'s self, _out: &mut Vec<&'s Block<A>>) {}

    fn collect_stmts<'s>(&'s self, _out: &mut Vec<&'s Statement<A>>) {}

    fn try_map_exprs(
        &mut self,
        f: &mut dyn FnMut(&mut Expression<A>) -> Result<(), AnalysisError>,
    ) -> Result<(), AnalysisError> {
        self.var.try_map_exprs(f)?;
        self.initial.try_map_exprs(f)?;
        self.limit.try_map_exprs(f)?;
        self.step.try_map_exprs(f)
    }
}

impl<A> Traverse<A> for Statement<A> {
    fn collect_exprs<'s>(&'s self, out: &mut Vec<&'s Expression<A>>) {
        match &self.kind {
            StmtKind::Declaration { declarators, .. } => declarators.collect_exprs(out),
            StmtKind::Assign { target, value } => {
                target.collect_exprs(out);
                value.collect_exprs(out);
            }
            StmtKind::Call { callee, args } => {
                callee.collect_exprs(out);
                args.collect_exprs(out);
            }
            StmtKind::Return { value } => value.collect_exprs(out),
            StmtKind::Print { args } => args.collect_exprs(out),
        }
    }

    fn collect_blocks<'s>(&'s self, _out: &mut Vec<&'s Block<A>>) {}

    fn collect_stmts<'s>(&'s self, out: &mut Vec<&'s Statement<A>>) {
        out.push(self);
    }

    fn try_map_exprs(
        &mut self,
        f: &mut dyn FnMut(&mut Expression<A>) -> Result<(), AnalysisError>,
    ) -> Result<(), AnalysisError> {
        match &mut self.kind {
            StmtKind::Declaration { declarators, .. } => declarators.try_map_exprs(f),
            StmtKind::Assign { target, value } => {
                target.try_map_exprs(f)?;
                value.try_map_exprs(f)
            }
            StmtKind::Call { callee, args } => {
                callee.try_map_exprs(f)?;
                args.try_map_exprs(f)
            }
            StmtKind::Return { value } => value.try_map_exprs(f),
            StmtKind::Print { args } => args.try_map_exprs(f),
        }
    }
}

impl<A> Traverse<A> for Declarator<A> {
    fn collect_exprs<'s>(&'s self, out: &mut Vec<&'s Expression<A>>) {
        self.var.collect_exprs(out);
        self.dims.collect_exprs(out);
        self.init.collect_exprs(out);
    }

    fn collect_blocks<'s>(&'s self, _out: &mut Vec<&'s Block<A>>) {}

    fn collect_stmts<'s>(&'s self, _out: &mut Vec<&'s Statement<A>>) {}

    fn try_map_exprs(
        &mut self,
        f: &mut dyn FnMut(&mut Expression<A>) -> Result<(), AnalysisError>,
    ) -> Result<(), AnalysisError> {
        self.var.try_map_exprs(f)?;
        self.dims.try_map_exprs(f)?;
        self.init.try_map_exprs(f)
    }
}

impl<A> Traverse<A> for Expression<A> {
    fn collect_exprs<'s>(&'s self, out: &mut Vec<&'s Expression<A>>) {
        out.push(self);
        match &self.kind {
            ExprKind::Value(_) => {}
            ExprKind::Binary { left, right, .. } => {
                left.collect_exprs(out);
                right.collect_exprs(out);
            }
            ExprKind::Unary { operand, .. } => operand.collect_exprs(out),
            ExprKind::Subscript { array, indices } => {
                array.collect_exprs(out);
                indices.collect_exprs(out);
            }
            ExprKind::FunctionCall { function, args } => {
                function.collect_exprs(out);
                args.collect_exprs(out);
            }
        }
    }

    fn collect_blocks<'s>(&'s self, _out: &mut Vec<&'s Block<A>>) {}

    fn collect_stmts<'s>(&'s self, _out: &mut Vec<&'s Statement<A>>) {}

    fn try_map_exprs(
        &mut self,
        f: &mut dyn FnMut(&mut Expression<A>) -> Result<(), AnalysisError>,
    ) -> Result<(), AnalysisError> {
        match &mut self.kind {
            ExprKind::Value(_) => {}
            ExprKind::Binary { left, right, .. } => {
                left.try_map_exprs(f)?;
                right.try_map_exprs(f)?;
            }
            ExprKind::Unary { operand, .. } => operand.try_map_exprs(f)?,
            ExprKind::Subscript { array, indices } => {
                array.try_map_exprs(f)?;
                indices.try_map_exprs(f)?;
            }
            ExprKind::FunctionCall { function, args } => {
                function.try_map_exprs(f)?;
                args.try_map_exprs(f)?;
            }
        }
        f(self)
    }
}
