//! Code generation and execution of analyzed stencils.
//!
//! A [Backend] lowers an [strata_ir::Context] whose extents have been
//! computed into a [Kernel]. Kernels are called with [Arguments] binding
//! every field of the signature to a [Storage] buffer large enough for the
//! field's halo.
mod args;
mod debug;
mod frame;
mod interface;
mod kernel;
mod schedule;
mod storage;
mod traits;
mod vector;

pub use args::{Arguments, FieldArg, Origin};
pub use debug::DebugBackend;
pub(crate) use frame::{Frame, Region};
pub use interface::{FieldInfo, Interface, ScalarInfo};
pub use storage::Storage;
pub use traits::{Backend, BackendKind, Kernel};
pub use vector::VectorBackend;

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::{BackendKind, Kernel};
    use strata_frontend::StrataParser;
    use strata_ir::{self as ir, Externals, TypeSignature};
    use strata_opt::pass_manager::PassManager;

    /// The IR of the first stencil in `src`, without any analysis.
    pub fn built(src: &str) -> ir::Context {
        let ns = StrataParser::parse_str("test", src).unwrap();
        ir::from_ast::ast_to_ir(
            &ns.stencils[0],
            &Externals::new(),
            &TypeSignature::new(),
        )
        .unwrap()
    }

    /// The IR of the first stencil in `src` after every default pass ran.
    pub fn analyzed(src: &str) -> ir::Context {
        let mut ctx = built(src);
        PassManager::default_passes()
            .unwrap()
            .execute_plan(&mut ctx, &["all".to_string()], &[], false)
            .unwrap();
        ctx
    }

    pub fn compile(src: &str, kind: BackendKind) -> Box<dyn Kernel> {
        kind.backend().build(&analyzed(src)).unwrap()
    }
}
