//! Helpers for traversing stencils
mod action;
mod diagnostics;
mod order;
mod visitor;

pub use action::{Action, VisResult};
pub use diagnostics::{DiagnosticContext, DiagnosticPass, DiagnosticResult};
pub use order::Order;
pub use visitor::{ConstructVisitor, Named, Visitor};
