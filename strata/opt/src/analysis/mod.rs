//! Analyses that compute information about a stencil without modifying it.
mod extents;
mod read_write_set;

pub use extents::ExtentAnalysis;
pub use read_write_set::ReadWriteSet;
