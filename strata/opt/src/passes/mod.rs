//! Passes for the Strata compiler.
mod infer_extents;
mod interval_check;
mod ordering_check;

pub use infer_extents::InferExtents;
pub use interval_check::IntervalCheck;
pub use ordering_check::OrderingCheck;
