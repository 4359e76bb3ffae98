//! # Analysis and validation passes for Strata stencils
//!
//! Passes operate on an [strata_ir::Context] and are run through a
//! [pass_manager::PassManager]. Validation passes collect diagnostics and
//! report the first error they found; analysis passes attach their results to
//! the context so that backends can read them.
//!
//! ```rust
//! use strata_frontend::StrataParser;
//! use strata_ir::{self as ir, Externals, TypeSignature};
//! use strata_opt::pass_manager::PassManager;
//! use strata_utils::StrataResult;
//!
//! fn main() -> StrataResult<()> {
//!     let ns = StrataParser::parse_str(
//!         "shift",
//!         "stencil shift(a: Field[f64], b: Field[f64]) {
//!              with computation(PARALLEL), interval(...) { b = a[1, 0, 0] }
//!          }",
//!     )?;
//!     let mut ctx = ir::from_ast::ast_to_ir(
//!         &ns.stencils[0],
//!         &Externals::new(),
//!         &TypeSignature::new(),
//!     )?;
//!     let pm = PassManager::default_passes()?;
//!     pm.execute_plan(&mut ctx, &["all".to_string()], &[], false)?;
//!     let a = ctx.extents()?.extent(&"a".into());
//!     assert_eq!(a.map(|e| e.i), Some((1, 1)));
//!     Ok(())
//! }
//! ```
pub mod analysis;
pub mod default_passes;
pub mod pass_manager;
pub mod passes;
pub mod traversal;
