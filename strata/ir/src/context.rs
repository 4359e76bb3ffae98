//! An IR context. This is the top-level object for a stencil and contains all
//! information needed to analyze, validate and emit it.
use crate::{ExtentMap, Externals, Stencil, TypeSignature};
use strata_utils::{Error, StrataResult};

/// The IR Context of one specialized stencil.
#[derive(Debug)]
pub struct Context {
    /// The stencil being compiled.
    pub stencil: Stencil,
    /// Values of the externals the stencil declares.
    pub externals: Externals,
    /// Element type overrides applied to the signature.
    pub signature: TypeSignature,
    /// Access extents. Empty until extent analysis has run.
    pub extents: Option<ExtentMap>,
    /// Smallest vertical domain the stencil can run on. Raised by the
    /// interval and ordering checks.
    pub min_k_size: u64,
}

impl Context {
    pub fn new(
        stencil: Stencil,
        externals: Externals,
        signature: TypeSignature,
    ) -> Self {
        Self {
            stencil,
            externals,
            signature,
            extents: None,
            min_k_size: 0,
        }
    }

    /// The extent map, or an error if extent analysis has not run.
    pub fn extents(&self) -> StrataResult<&ExtentMap> {
        self.extents.as_ref().ok_or_else(|| {
            Error::backend(format!(
                "extents of `{}' were never computed",
                self.stencil.name
            ))
        })
    }
}
