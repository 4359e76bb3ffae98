//! Actions control the traversal of stencils.
use strata_utils::StrataResult;

/// Result of performing a visit.
pub type VisResult = StrataResult<Action>;

/// Action performed at the end of visiting a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Continue traversal of the stencil.
    Continue,
    /// Globally abort traversal of the stencil.
    Stop,
    /// Skips the traversal of this node's children but continues traversing
    /// the sibling nodes.
    SkipChildren,
}

impl Action {
    /// Run the traversal specified by `next` if this traversal succeeds.
    /// If the result of this traversal is not `Action::Continue`, do not
    /// run `next()`.
    pub(super) fn and_then<F>(self, mut next: F) -> VisResult
    where
        F: FnMut() -> VisResult,
    {
        match self {
            Action::Continue => next(),
            Action::Stop | Action::SkipChildren => Ok(self),
        }
    }

    /// Changes a Action::SkipChildren to Action::Continue.
    /// Should be called to indicate the boundary of traversing the children
    /// of a node.
    pub(super) fn pop(self) -> Self {
        match self {
            Action::SkipChildren => Action::Continue,
            x => x,
        }
    }
}
