//! Shared utilities for the Strata stencil compiler.
mod errors;
mod id;
mod namegenerator;
mod out_file;
mod position;

pub use errors::{Error, ErrorKind, StrataResult};
pub use id::{GetName, Id};
pub use namegenerator::NameGenerator;
pub use out_file::OutputFile;
pub use position::{
    FileIdx, GPosIdx, GlobalPositionTable, PosIdx, PositionTable, WithPos,
};
