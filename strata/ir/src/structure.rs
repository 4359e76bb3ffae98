//! The stencil representation produced by [crate::from_ast].
use crate::Interval;
use linked_hash_map::LinkedHashMap;
use std::fmt::{self, Display};
use strata_frontend::{BinaryOp, DataType, Dims, Literal, Policy, UnaryOp};
use strata_utils::{GPosIdx, GetName, Id, WithPos};

/// How a stencil uses a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum FieldKind {
    /// API field that is only read.
    Input,
    /// API field that is assigned somewhere in the stencil.
    Output,
    /// Field owned by the backend. Not part of the signature.
    Temporary,
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Input => write!(f, "input"),
            FieldKind::Output => write!(f, "output"),
            FieldKind::Temporary => write!(f, "temporary"),
        }
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct FieldDecl {
    pub name: Id,
    pub dtype: DataType,
    pub dims: Dims,
    pub kind: FieldKind,
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub span: GPosIdx,
}

impl FieldDecl {
    /// True for fields passed in by the caller.
    pub fn is_api(&self) -> bool {
        self.kind != FieldKind::Temporary
    }

    pub fn is_zero_dim(&self) -> bool {
        self.dims == Dims::Zero
    }
}

impl GetName for FieldDecl {
    fn name(&self) -> Id {
        self.name
    }
}

impl WithPos for FieldDecl {
    fn copy_span(&self) -> GPosIdx {
        self.span
    }
}

/// Keyword-only scalar parameter.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ScalarDecl {
    pub name: Id,
    pub dtype: DataType,
}

/// A relative grid offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Offset {
    pub i: i64,
    pub j: i64,
    pub k: i64,
}

impl Offset {
    pub fn new(i: i64, j: i64, k: i64) -> Self {
        Self { i, j, k }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// The offset with its vertical component dropped.
    pub fn horizontal(&self) -> Self {
        Self::new(self.i, self.j, 0)
    }
}

impl From<[i64; 3]> for Offset {
    fn from([i, j, k]: [i64; 3]) -> Self {
        Self::new(i, j, k)
    }
}

impl Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.i, self.j, self.k)
    }
}

/// Right-hand side of a statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Read of a field at a relative offset.
    Field { name: Id, offset: Offset },
    /// Read of a scalar parameter.
    Scalar(Id),
    Lit(Literal),
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `then` if `cond` is non-zero, `els` otherwise.
    Cond {
        cond: Box<Expr>,
        then: Box<Expr>,
        els: Box<Expr>,
    },
}

impl Expr {
    pub fn field(name: Id, offset: Offset) -> Self {
        Expr::Field { name, offset }
    }

    /// Call `f` on every field read in evaluation order.
    pub fn for_each_read<F: FnMut(Id, Offset)>(&self, f: &mut F) {
        match self {
            Expr::Field { name, offset } => f(*name, *offset),
            Expr::Scalar(_) | Expr::Lit(_) => (),
            Expr::Unary { arg, .. } => arg.for_each_read(f),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.for_each_read(f);
                rhs.for_each_read(f);
            }
            Expr::Cond { cond, then, els } => {
                cond.for_each_read(f);
                then.for_each_read(f);
                els.for_each_read(f);
            }
        }
    }

    /// All field reads of this expression.
    pub fn reads(&self) -> Vec<(Id, Offset)> {
        let mut reads = Vec::new();
        self.for_each_read(&mut |name, offset| reads.push((name, offset)));
        reads
    }
}

/// `target = value`, evaluated at every point of the statement's region.
#[derive(Clone, Debug)]
pub struct Stmt {
    pub target: Id,
    pub value: Expr,
    pub span: GPosIdx,
}

impl WithPos for Stmt {
    fn copy_span(&self) -> GPosIdx {
        self.span
    }
}

/// Statements restricted to a vertical range.
#[derive(Clone, Debug)]
pub struct IntervalBlock {
    pub interval: Interval,
    pub stmts: Vec<Stmt>,
    pub span: GPosIdx,
}

impl WithPos for IntervalBlock {
    fn copy_span(&self) -> GPosIdx {
        self.span
    }
}

/// Interval blocks sharing an iteration policy.
#[derive(Clone, Debug)]
pub struct ComputationBlock {
    pub policy: Policy,
    pub intervals: Vec<IntervalBlock>,
    pub span: GPosIdx,
}

impl WithPos for ComputationBlock {
    fn copy_span(&self) -> GPosIdx {
        self.span
    }
}

/// Position of a statement: block, interval and statement indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtRef {
    pub block: usize,
    pub interval: usize,
    pub stmt: usize,
}

impl Display for StmtRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.block, self.interval, self.stmt)
    }
}

/// A stencil with all names resolved.
#[derive(Clone, Debug)]
pub struct Stencil {
    pub name: Id,
    /// API fields in signature order followed by the temporaries in order of
    /// their first assignment.
    pub fields: LinkedHashMap<Id, FieldDecl>,
    pub scalars: LinkedHashMap<Id, ScalarDecl>,
    /// Computation blocks in execution order.
    pub blocks: Vec<ComputationBlock>,
    pub span: GPosIdx,
}

impl Stencil {
    pub fn field(&self, name: &Id) -> Option<&FieldDecl> {
        self.fields.get(name)
    }

    /// Fields that are part of the signature, in signature order.
    pub fn api_fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.values().filter(|f| f.is_api())
    }

    pub fn temporaries(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.values().filter(|f| !f.is_api())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.values().filter(|f| f.kind == FieldKind::Output)
    }

    /// Every statement with its position, in execution order.
    pub fn statements(&self) -> impl Iterator<Item = (StmtRef, &Stmt)> {
        self.blocks.iter().enumerate().flat_map(|(b, block)| {
            block.intervals.iter().enumerate().flat_map(move |(i, iv)| {
                iv.stmts.iter().enumerate().map(move |(s, stmt)| {
                    (
                        StmtRef {
                            block: b,
                            interval: i,
                            stmt: s,
                        },
                        stmt,
                    )
                })
            })
        })
    }
}

impl GetName for Stencil {
    fn name(&self) -> Id {
        self.name
    }
}

impl WithPos for Stencil {
    fn copy_span(&self) -> GPosIdx {
        self.span
    }
}
