//! # The Strata stencil compiler
//!
//! This crate plumbs together the Strata compiler crates: stencil definitions
//! are parsed by [`strata_frontend`], lowered into the IR of [`strata_ir`],
//! validated and analyzed by the passes in [`strata_opt`] and turned into
//! callable kernels by [`strata_backend`]. The [Registry] ties the pipeline
//! together and caches compiled stencils by their [StencilId].
pub mod pipeline;
mod registry;

pub use registry::{
    CacheStats, CompiledStencil, Definition, Registry, StencilId,
};
pub use strata_backend::{
    Arguments, BackendKind, FieldArg, Interface, Kernel, Origin, Storage,
};
pub use strata_ir::{DataType, Externals, Literal, TypeSignature};
pub use strata_utils::{Error, ErrorKind, StrataResult};
