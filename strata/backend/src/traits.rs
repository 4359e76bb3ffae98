//! Interface for a Strata backend.
use crate::{Arguments, DebugBackend, Interface, Origin, VectorBackend};
use itertools::Itertools;
use std::fmt::{self, Display};
use std::io;
use std::str::FromStr;
use strata_ir::{self as ir, Id};
use strata_utils::{Error, StrataResult};

/// A compiled stencil, ready to be called.
pub trait Kernel: fmt::Debug + Send + Sync {
    /// Name of the stencil this kernel implements.
    fn name(&self) -> Id;
    /// The backend that produced this kernel.
    fn backend(&self) -> BackendKind;
    /// Fields and scalars the kernel expects.
    fn interface(&self) -> &Interface;
    /// Run the stencil over `domain`, starting at `origin` in every buffer.
    fn run(
        &self,
        args: Arguments<'_>,
        origin: &Origin,
        domain: [usize; 3],
    ) -> StrataResult<()>;
    /// Print the generated code.
    fn emit(&self, out: &mut dyn io::Write) -> io::Result<()>;
}

/// A backend for Strata.
pub trait Backend: Send + Sync {
    /// The name of this backend.
    fn name(&self) -> &'static str;
    /// Validate the context for code generation with this backend. Returns an
    /// Err(..) if the context cannot be lowered.
    fn validate(&self, ctx: &ir::Context) -> StrataResult<()> {
        ctx.extents().map(|_| ())
    }
    /// Lower the context into a kernel.
    fn compile(&self, ctx: &ir::Context) -> StrataResult<Box<dyn Kernel>>;
    /// Convenience function to validate and compile the context.
    fn build(&self, ctx: &ir::Context) -> StrataResult<Box<dyn Kernel>> {
        self.validate(ctx)?;
        let kernel = self.compile(ctx)?;
        log::info!("{}: compiled `{}'", self.name(), ctx.stencil.name);
        Ok(kernel)
    }
}

/// Enumeration of valid backends
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    #[default]
    Debug,
    Vector,
}

/// Return a vector that maps strings to Backends.
#[inline(always)]
fn backends() -> Vec<(&'static str, BackendKind)> {
    vec![("debug", BackendKind::Debug), ("vector", BackendKind::Vector)]
}

impl BackendKind {
    pub fn backend(&self) -> &'static dyn Backend {
        match self {
            BackendKind::Debug => &DebugBackend,
            BackendKind::Vector => &VectorBackend,
        }
    }

    /// Every backend, in the order they are listed in help text.
    pub fn all() -> Vec<BackendKind> {
        backends().into_iter().map(|(_, kind)| kind).collect()
    }
}

/// Command line parsing for the Backend enum
impl FromStr for BackendKind {
    type Err = String;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let backends = backends();
        let found_backend = backends
            .iter()
            .find(|(backend_name, _)| &input == backend_name);
        if let Some((_, kind)) = found_backend {
            Ok(*kind)
        } else {
            // build list of backends for error message
            let backend_str =
                backends.iter().map(|(name, _)| *name).join(", ");
            Err(format!(
                "`{input}' is not a valid backend.\nValid backends: {backend_str}"
            ))
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.backend().name())
    }
}

impl TryFrom<&str> for BackendKind {
    type Error = Error;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse().map_err(Error::misc)
    }
}
