use crate::analysis::ExtentAnalysis;
use crate::traversal::{Action, Named, VisResult, Visitor};
use strata_ir as ir;

/// Attaches the result of [ExtentAnalysis] to the context.
#[derive(Default)]
pub struct InferExtents;

impl Named for InferExtents {
    fn name() -> &'static str {
        "infer-extents"
    }

    fn description() -> &'static str {
        "Compute the halo every field needs and the region of every statement"
    }
}

impl Visitor for InferExtents {
    fn start(&mut self, ctx: &mut ir::Context) -> VisResult {
        ctx.extents = Some(ExtentAnalysis::compute(&ctx.stencil)?);
        // The analysis walks the stencil on its own.
        Ok(Action::Stop)
    }
}
