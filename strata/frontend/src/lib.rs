//! Frontend parsing and AST representation.
//!
//! Defines the frontend AST and the parser.
//! The frontend representation is transformed into the representation defined
//! in the `strata-ir` crate.

pub mod ast;
pub mod parser;
pub mod printer;

mod common;

pub use ast::Namespace;
pub use common::{BinaryOp, DataType, Dims, Literal, Policy, UnaryOp};
pub use parser::StrataParser;
pub use printer::Printer;
