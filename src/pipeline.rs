//! The stages every compilation goes through.
use strata_backend::{BackendKind, Kernel};
use strata_frontend::ast;
use strata_ir::{self as ir, Externals, TypeSignature};
use strata_opt::pass_manager::PassManager;
use strata_utils::StrataResult;

/// Passes run on every stencil before code generation.
pub const DEFAULT_PLAN: &str = "all";

/// Build the IR of `def` and run the validation and analysis passes on it.
pub fn analyze(
    def: &ast::StencilDef,
    externals: &Externals,
    signature: &TypeSignature,
) -> StrataResult<ir::Context> {
    let mut ctx = ir::from_ast::ast_to_ir(def, externals, signature)?;
    let pm = PassManager::default_passes()?;
    pm.execute_plan(&mut ctx, &[DEFAULT_PLAN.to_string()], &[], false)?;
    if let Some(extents) = &ctx.extents {
        for (field, fe) in extents.fields() {
            log::debug!("{}: `{field}' extent {}", ctx.stencil.name, fe.extent);
        }
    }
    Ok(ctx)
}

/// Lower an analyzed context with `backend`.
pub fn codegen(
    ctx: &ir::Context,
    backend: BackendKind,
) -> StrataResult<Box<dyn Kernel>> {
    backend.backend().build(ctx)
}
