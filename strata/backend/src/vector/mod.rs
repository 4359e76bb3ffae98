//! Backend that evaluates each statement one region at a time.
//!
//! Statements are lowered into straight-line register programs
//! ([lower::Program]). A register holds one value per point of the region
//! being computed, so loads become contiguous copies along the vertical axis
//! and every operator runs as a tight loop over a slice. Sequential blocks
//! evaluate one plane at a time.
mod exec;
mod lower;

use crate::kernel::ScheduledKernel;
use crate::schedule::Schedule;
use crate::{Backend, BackendKind, Interface, Kernel};
use lower::Program;
use strata_ir as ir;
use strata_utils::StrataResult;

#[derive(Default, Debug, Clone, Copy)]
pub struct VectorBackend;

impl Backend for VectorBackend {
    fn name(&self) -> &'static str {
        "vector"
    }

    fn compile(&self, ctx: &ir::Context) -> StrataResult<Box<dyn Kernel>> {
        let iface = Interface::new(ctx)?;
        let schedule = Schedule::build(ctx, &iface, |stmt| {
            Program::lower(&stmt.value, &iface)
        })?;
        let instrs: usize = schedule
            .blocks
            .iter()
            .flat_map(|b| &b.intervals)
            .flat_map(|iv| &iv.stages)
            .map(|s| s.body.code.len())
            .sum();
        log::debug!("`{}': {instrs} vector instructions", iface.name);
        Ok(Box::new(ScheduledKernel::new(
            BackendKind::Vector,
            iface,
            schedule,
        )))
    }
}
