//! Internal representation of stencils.
//!
//! The representation is generated from the frontend AST by [from_ast].
//! The key differences between the frontend AST and the IR are:
//! 1. Names are resolved: externals are substituted, every field read refers
//!    to a declared field and temporaries are explicit.
//! 2. Interval bounds are normalized to [AxisBound]s.
//! 3. `if` statements are lowered into conditional assignments.

mod context;
mod extent;
mod externals;
mod interval;
mod printer;
mod structure;

/// Module to transform AST stencils into IR.
pub mod from_ast;

pub use context::Context;
pub use extent::{Extent, ExtentMap, FieldExtent, Halo};
pub use externals::{Externals, TypeSignature};
pub use interval::{AxisBound, Interval, Level};
pub use printer::Printer;
pub use structure::{
    ComputationBlock, Expr, FieldDecl, FieldKind, IntervalBlock, Offset,
    ScalarDecl, Stencil, Stmt, StmtRef,
};

// Re-export types from the frontend.
pub use strata_frontend::{
    BinaryOp, DataType, Dims, Literal, Policy, UnaryOp,
};
pub use strata_utils::{GetName, Id};
