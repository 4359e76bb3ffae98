//! Abstract Syntax Tree for stencil definitions
use crate::{BinaryOp, DataType, Dims, Literal, UnaryOp};
use strata_utils::{GPosIdx, GetName, Id, WithPos};

/// All stencils defined in one source file.
#[derive(Debug, Default)]
pub struct Namespace {
    pub stencils: Vec<StencilDef>,
}

impl Namespace {
    /// Find a stencil by name.
    pub fn find(&self, name: &str) -> Option<&StencilDef> {
        self.stencils.iter().find(|s| s.name == name)
    }
}

/// A single stencil definition.
#[derive(Debug, Clone)]
pub struct StencilDef {
    /// Name of the stencil
    pub name: Id,
    /// Positional field parameters in signature order
    pub fields: Vec<FieldParam>,
    /// Keyword-only scalar parameters
    pub scalars: Vec<ScalarParam>,
    /// Names declared by `externals` statements
    pub externals: Vec<(Id, GPosIdx)>,
    /// Computation blocks in source order
    pub computations: Vec<Computation>,
    pub span: GPosIdx,
}

impl GetName for StencilDef {
    fn name(&self) -> Id {
        self.name
    }
}

impl WithPos for StencilDef {
    fn copy_span(&self) -> GPosIdx {
        self.span
    }
}

/// `name: Field[dtype, dims]`
#[derive(Debug, Clone)]
pub struct FieldParam {
    pub name: Id,
    pub dtype: DataType,
    pub dims: Dims,
    pub span: GPosIdx,
}

impl WithPos for FieldParam {
    fn copy_span(&self) -> GPosIdx {
        self.span
    }
}

/// `name: dtype` after the `*` marker.
#[derive(Debug, Clone)]
pub struct ScalarParam {
    pub name: Id,
    pub dtype: DataType,
    pub span: GPosIdx,
}

impl WithPos for ScalarParam {
    fn copy_span(&self) -> GPosIdx {
        self.span
    }
}

/// A `with computation(POLICY)` block.
#[derive(Debug, Clone)]
pub struct Computation {
    /// The policy name as written. Resolved by the IR builder.
    pub policy: Id,
    pub intervals: Vec<IntervalDef>,
    pub span: GPosIdx,
}

impl WithPos for Computation {
    fn copy_span(&self) -> GPosIdx {
        self.span
    }
}

/// An `interval(..)` with its body.
#[derive(Debug, Clone)]
pub struct IntervalDef {
    pub range: IntervalRange,
    pub body: Vec<Stmt>,
    pub span: GPosIdx,
}

impl WithPos for IntervalDef {
    fn copy_span(&self) -> GPosIdx {
        self.span
    }
}

/// The vertical range of an interval as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum IntervalRange {
    /// `...`: every level.
    Full,
    Bounds(Bound, Bound),
}

/// One end of an interval.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// Non-negative values count from the bottom, negative ones from the top.
    Int(i64),
    /// `None`: the top of the domain.
    None,
    /// An integer external.
    External(Id, GPosIdx),
}

/// A statement in an interval body.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `target = value` or `target[0, 0, 0] = value`
    Assign {
        target: Id,
        offset: Option<[i64; 3]>,
        value: Expr,
        span: GPosIdx,
    },
    /// `if cond { .. } else { .. }`. `else if` chains nest in `els`.
    If {
        cond: Expr,
        then: Vec<Stmt>,
        els: Vec<Stmt>,
        span: GPosIdx,
    },
}

impl WithPos for Stmt {
    fn copy_span(&self) -> GPosIdx {
        match self {
            Stmt::Assign { span, .. } | Stmt::If { span, .. } => *span,
        }
    }
}

/// An expression with its source position.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: GPosIdx,
}

impl WithPos for Expr {
    fn copy_span(&self) -> GPosIdx {
        self.span
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Lit(Literal),
    /// A bare name: a field at offset zero, a scalar, or an external.
    Name(Id),
    /// `name[di, dj, dk]`
    Access { name: Id, offset: [i64; 3] },
    Unary { op: UnaryOp, arg: Box<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `then if cond else els`
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        els: Box<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: GPosIdx) -> Self {
        Self { kind, span }
    }
}
