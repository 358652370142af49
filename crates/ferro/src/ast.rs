use serde::{Deserialize, Serialize};
use strum::Display;

/// A source-level identifier spelling.
///
/// After renaming, variable references carry a `UniqueName` instead: a name
/// guaranteed injective across the whole program file. Both are plain strings;
/// the distinction is a contract, not a representation.
pub type Name = String;

/// A name guaranteed unique across a program file, produced by the renamer.
pub type UniqueName = String;

/// A line/column position in the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// A half-open span of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SrcSpan {
    pub start: Position,
    pub end: Position,
}

impl SrcSpan {
    /// The span used for synthesized nodes that have no source location.
    pub const fn initial() -> Self {
        let p = Position { line: 0, column: 0 };
        Self { start: p, end: p }
    }
}

impl Default for SrcSpan {
    fn default() -> Self {
        Self::initial()
    }
}

/// File-level information the parser records alongside the program units.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetaInfo {
    pub filename: String,
}

/// A whole parsed source file: the root of the AST.
///
/// Every node below carries an annotation slot `a` supplied by the caller.
/// The analysis passes layer their own metadata over it with
/// [`init_analysis`](crate::init_analysis) and strip it again with
/// [`strip_analysis`](crate::strip_analysis).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramFile<A> {
    pub a: A,
    pub meta: MetaInfo,
    pub program_units: Vec<ProgramUnit<A>>,
}

/// A top-level Fortran scope: main program, function, subroutine, module or
/// block data.
///
/// `contained` holds CONTAINS-style nested program units; it is empty for
/// unit kinds that cannot nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramUnit<A> {
    pub a: A,
    pub span: SrcSpan,
    pub kind: PuKind,
    pub body: Vec<Block<A>>,
    pub contained: Vec<ProgramUnit<A>>,
}

/// The kind-specific header data of a program unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PuKind {
    Main {
        /// `program foo` carries a name; a bare main program does not.
        name: Option<Name>,
    },
    Function {
        name: Name,
        args: Vec<Name>,
        /// Explicit `result(r)` variable, when present. Otherwise writes to
        /// the function name itself set the return value.
        result: Option<Name>,
        return_type: Option<BaseType>,
    },
    Subroutine {
        name: Name,
        args: Vec<Name>,
    },
    Module {
        name: Name,
    },
    BlockData {
        name: Option<Name>,
    },
}

impl PuKind {
    /// The structured name of this unit, stable across renaming.
    pub fn unit_name(&self) -> ProgramUnitName {
        match self {
            Self::Main { name: Some(n) }
            | Self::Function { name: n, .. }
            | Self::Subroutine { name: n, .. }
            | Self::Module { name: n } => ProgramUnitName::Named(n.clone()),
            Self::BlockData { name: Some(n) } => ProgramUnitName::Named(n.clone()),
            Self::Main { name: None } => ProgramUnitName::NamelessMain,
            Self::BlockData { name: None } => ProgramUnitName::NamelessBlockData,
        }
    }
}

/// Either a source-level unit name or one of the distinguished anonymous
/// forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgramUnitName {
    Named(Name),
    NamelessMain,
    NamelessBlockData,
}

impl std::fmt::Display for ProgramUnitName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(n) => f.write_str(n),
            Self::NamelessMain => f.write_str("MAIN"),
            Self::NamelessBlockData => f.write_str("BLOCKDATA"),
        }
    }
}

/// A statement-level unit of the AST.
///
/// The basic-block pass attaches a file-unique integer label to each block's
/// annotation; the dataflow analyses key their relations by those labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block<A> {
    pub a: A,
    pub span: SrcSpan,
    pub kind: BlockKind<A>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockKind<A> {
    Statement(Statement<A>),
    If {
        /// `if` / `else if` arms in source order.
        clauses: Vec<IfClause<A>>,
        else_blocks: Option<Vec<Block<A>>>,
    },
    /// A counted do-loop.
    Do {
        spec: DoSpec<A>,
        body: Vec<Block<A>>,
    },
    DoWhile {
        condition: Expression<A>,
        body: Vec<Block<A>>,
    },
}

/// One guarded arm of an if-construct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfClause<A> {
    pub condition: Expression<A>,
    pub blocks: Vec<Block<A>>,
}

/// The loop-control specification of a counted do: `do var = initial, limit[, step]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoSpec<A> {
    pub a: A,
    pub span: SrcSpan,
    /// The loop variable, an assignment target.
    pub var: Expression<A>,
    pub initial: Expression<A>,
    pub limit: Expression<A>,
    pub step: Option<Expression<A>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement<A> {
    pub a: A,
    pub span: SrcSpan,
    pub kind: StmtKind<A>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind<A> {
    /// A type declaration statement: `integer :: i, v(10)`.
    Declaration {
        base_type: BaseType,
        declarators: Vec<Declarator<A>>,
    },
    Assign {
        target: Expression<A>,
        value: Expression<A>,
    },
    /// A subroutine call. Some dialects permit `call foo` with no argument
    /// list at all, which is distinct from `call foo()`.
    Call {
        callee: Expression<A>,
        args: Option<Vec<Expression<A>>>,
    },
    Return {
        value: Option<Expression<A>>,
    },
    Print {
        args: Vec<Expression<A>>,
    },
}

/// One declared entity inside a declaration statement.
///
/// `dims` is present for array declarators (`v(10, n)`); `init` for
/// initialized declarations (`integer :: i = 0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declarator<A> {
    pub a: A,
    pub span: SrcSpan,
    pub var: Expression<A>,
    pub dims: Option<Vec<Expression<A>>>,
    pub init: Option<Expression<A>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression<A> {
    pub a: A,
    pub span: SrcSpan,
    pub kind: ExprKind<A>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind<A> {
    Value(Value),
    Binary {
        op: BinaryOp,
        left: Box<Expression<A>>,
        right: Box<Expression<A>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression<A>>,
    },
    /// An array element or section access: `v(i, j)`.
    Subscript {
        array: Box<Expression<A>>,
        indices: Vec<Expression<A>>,
    },
    FunctionCall {
        function: Box<Expression<A>>,
        args: Option<Vec<Expression<A>>>,
    },
}

/// A leaf value. Numeric literals keep their source spelling; the analyses
/// never interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Variable(Name),
    Integer(String),
    Real(String),
    Logical(bool),
    Str(String),
    /// The callee position of a call statement, when the parser has resolved it.
    SubroutineName(Name),
    /// The head of a function-call expression, when the parser has resolved it.
    FunctionName(Name),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum BaseType {
    Integer,
    Real,
    DoublePrecision,
    Complex,
    Logical,
    Character,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
}

// --- Annotation access ---

/// Uniform access to the annotation slot and span of any AST node.
pub trait Annotated<A> {
    fn annotation(&self) -> &A;
    fn annotation_mut(&mut self) -> &mut A;
    fn span(&self) -> SrcSpan;
}

macro_rules! impl_annotated {
    ($($ty:ident),+) => {
        $(impl<A> Annotated<A> for $ty<A> {
            fn annotation(&self) -> &A {
                &self.a
            }

            fn annotation_mut(&mut self) -> &mut A {
                &mut self.a
            }

            fn span(&self) -> SrcSpan {
                self.span
            }
        })+
    };
}

impl_annotated!(ProgramUnit, Block, DoSpec, Statement, Declarator, Expression);

// --- Structural re-annotation ---
//
// The annotation layer swaps the annotation type of a whole tree without
// touching its shape. Each node maps itself and hands the closure down.

impl<A> ProgramFile<A> {
    pub fn map_annotation<B>(self, f: &mut impl FnMut(A) -> B) -> ProgramFile<B> {
        ProgramFile {
            a: f(self.a),
            meta: self.meta,
            program_units: self.program_units.into_iter().map(|pu| pu.map_annotation(f)).collect(),
        }
    }
}

impl<A> ProgramUnit<A> {
    pub fn map_annotation<B>(self, f: &mut impl FnMut(A) -> B) -> ProgramUnit<B> {
        ProgramUnit {
            a: f(self.a),
            span: self.span,
            kind: self.kind,
            body: self.body.into_iter().map(|b| b.map_annotation(f)).collect(),
            contained: self.contained.into_iter().map(|pu| pu.map_annotation(f)).collect(),
        }
    }
}

impl<A> Block<A> {
    pub fn map_annotation<B>(self, f: &mut impl FnMut(A) -> B) -> Block<B> {
        let kind = match self.kind {
            BlockKind::Statement(st) => BlockKind::Statement(st.map_annotation(f)),
            BlockKind::If { clauses, else_blocks } => BlockKind::If {
                clauses: clauses
                    .into_iter()
                    .map(|c| IfClause {
                        condition: c.condition.map_annotation(f),
                        blocks: c.blocks.into_iter().map(|b| b.map_annotation(f)).collect(),
                    })
                    .collect(),
                else_blocks: else_blocks.map(|bs| bs.into_iter().map(|b| b.map_annotation(f)).collect()),
            },
            BlockKind::Do { spec, body } => BlockKind::Do {
                spec: spec.map_annotation(f),
                body: body.into_iter().map(|b| b.map_annotation(f)).collect(),
            },
            BlockKind::DoWhile { condition, body } => BlockKind::DoWhile {
                condition: condition.map_annotation(f),
                body: body.into_iter().map(|b| b.map_annotation(f)).collect(),
            },
        };
        Block {
            a: f(self.a),
            span: self.span,
            kind,
        }
    }
}

impl<A> DoSpec<A> {
    pub fn map_annotation<B>(self, f: &mut impl FnMut(A) -> B) -> DoSpec<B> {
        DoSpec {
            a: f(self.a),
            span: self.span,
            var: self.var.map_annotation(f),
            initial: self.initial.map_annotation(f),
            limit: self.limit.map_annotation(f),
            step: self.step.map(|e| e.map_annotation(f)),
        }
    }
}

impl<A> Statement<A> {
    pub fn map_annotation<B>(self, f: &mut impl FnMut(A) -> B) -> Statement<B> {
        let kind = match self.kind {
            StmtKind::Declaration { base_type, declarators } => StmtKind::Declaration {
                base_type,
                declarators: declarators.into_iter().map(|d| d.map_annotation(f)).collect(),
            },
            StmtKind::Assign { target, value } => StmtKind::Assign {
                target: target.map_annotation(f),
                value: value.map_annotation(f),
            },
            StmtKind::Call { callee, args } => StmtKind::Call {
                callee: callee.map_annotation(f),
                args: args.map(|es| es.into_iter().map(|e| e.map_annotation(f)).collect()),
            },
            StmtKind::Return { value } => StmtKind::Return {
                value: value.map(|e| e.map_annotation(f)),
            },
            StmtKind::Print { args } => StmtKind::Print {
                args: args.into_iter().map(|e| e.map_annotation(f)).collect(),
            },
        };
        Statement {
            a: f(self.a),
            span: self.span,
            kind,
        }
    }
}

impl<A> Declarator<A> {
    pub fn map_annotation<B>(self, f: &mut impl FnMut(A) -> B) -> Declarator<B> {
        Declarator {
            a: f(self.a),
            span: self.span,
            var: self.var.map_annotation(f),
            dims: self.dims.map(|ds| ds.into_iter().map(|e| e.map_annotation(f)).collect()),
            init: self.init.map(|e| e.map_annotation(f)),
        }
    }
}

impl<A> Expression<A> {
    pub fn map_annotation<B>(self, f: &mut impl FnMut(A) -> B) -> Expression<B> {
        let kind = match self.kind {
            ExprKind::Value(v) => ExprKind::Value(v),
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op,
                left: Box::new(left.map_annotation(f)),
                right: Box::new(right.map_annotation(f)),
            },
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op,
                operand: Box::new(operand.map_annotation(f)),
            },
            ExprKind::Subscript { array, indices } => ExprKind::Subscript {
                array: Box::new(array.map_annotation(f)),
                indices: indices.into_iter().map(|e| e.map_annotation(f)).collect(),
            },
            ExprKind::FunctionCall { function, args } => ExprKind::FunctionCall {
                function: Box::new(function.map_annotation(f)),
                args: args.map(|es| es.into_iter().map(|e| e.map_annotation(f)).collect()),
            },
        };
        Expression {
            a: f(self.a),
            span: self.span,
            kind,
        }
    }
}
