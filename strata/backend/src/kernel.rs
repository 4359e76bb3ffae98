use crate::schedule::{Schedule, StageBody};
use crate::{Arguments, BackendKind, Frame, Interface, Kernel, Origin};
use itertools::Itertools;
use std::fmt;
use std::io;
use strata_ir::Id;
use strata_utils::StrataResult;

/// A [Schedule] bound to the interface it was compiled for.
pub(crate) struct ScheduledKernel<B> {
    kind: BackendKind,
    iface: Interface,
    schedule: Schedule<B>,
}

impl<B: StageBody> ScheduledKernel<B> {
    pub fn new(kind: BackendKind, iface: Interface, schedule: Schedule<B>) -> Self {
        Self {
            kind,
            iface,
            schedule,
        }
    }
}

impl<B> fmt::Debug for ScheduledKernel<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledKernel")
            .field("kind", &self.kind)
            .field("iface", &self.iface)
            .finish_non_exhaustive()
    }
}

impl<B: StageBody> Kernel for ScheduledKernel<B> {
    fn name(&self) -> Id {
        self.iface.name
    }

    fn backend(&self) -> BackendKind {
        self.kind
    }

    fn interface(&self) -> &Interface {
        &self.iface
    }

    fn run(
        &self,
        args: Arguments<'_>,
        origin: &Origin,
        domain: [usize; 3],
    ) -> StrataResult<()> {
        let bound = args.bind(&self.iface, origin, domain)?;
        let mut frame = Frame::new(&self.iface, bound, domain);
        self.schedule.execute(&mut frame, domain)
    }

    fn emit(&self, out: &mut dyn io::Write) -> io::Result<()> {
        writeln!(out, "// {} kernel `{}'", self.kind, self.iface.name)?;
        for field in &self.iface.fields {
            let halo = field
                .halo
                .iter()
                .map(|(lo, hi)| format!("{lo}:{hi}"))
                .join(", ");
            writeln!(
                out,
                "// {} {}: {}[{}] halo ({halo})",
                field.kind, field.name, field.dtype, field.dims
            )?;
        }
        for scalar in &self.iface.scalars {
            writeln!(out, "// scalar {}: {}", scalar.name, scalar.dtype)?;
        }
        if self.iface.min_k_size > 0 {
            writeln!(out, "// min k size {}", self.iface.min_k_size)?;
        }
        self.schedule.write_text(out)
    }
}
