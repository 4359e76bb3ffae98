//! Defines the default passes available to [PassManager].
use crate::passes::{InferExtents, IntervalCheck, OrderingCheck};
use crate::traversal::Named;
use crate::{pass_manager::PassManager, register_alias};
use strata_utils::StrataResult;

impl PassManager {
    pub fn default_passes() -> StrataResult<Self> {
        // Construct the pass manager and register all passes.
        let mut pm = PassManager::default();

        // Validation passes
        pm.register_diagnostic::<IntervalCheck>()?;
        pm.register_diagnostic::<OrderingCheck>()?;

        // Analysis passes
        pm.register_pass::<InferExtents>()?;

        register_alias!(pm, "validate", [IntervalCheck, OrderingCheck]);
        register_alias!(pm, "analyze", [InferExtents]);
        register_alias!(pm, "all", ["validate", "analyze"]);

        Ok(pm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::context;
    use strata_utils::ErrorKind;

    fn all() -> Vec<String> {
        vec!["all".to_string()]
    }

    #[test]
    fn help_lists_passes_and_aliases() {
        let pm = PassManager::default_passes().unwrap();
        let help = pm.complete_help();
        assert!(help.contains("- interval-check:"));
        assert!(help.contains("- all: interval-check, ordering-check, infer-extents"));
        assert!(pm.specific_help("validate").is_some());
        assert!(pm.specific_help("nope").is_none());
    }

    #[test]
    fn unknown_passes_are_rejected() {
        let pm = PassManager::default_passes().unwrap();
        let mut ctx = context(
            "stencil s(a: Field[f64], b: Field[f64]) {
                with computation(PARALLEL), interval(...) { b = a }
            }",
        )
        .unwrap();
        let err = pm
            .execute_plan(&mut ctx, &["dead-code".to_string()], &[], false)
            .unwrap_err();
        assert!(err.message().contains("Unknown pass: dead-code"));
    }

    #[test]
    fn first_diagnostic_is_returned() {
        let pm = PassManager::default_passes().unwrap();
        let mut ctx = context(
            "stencil s(a: Field[f64], b: Field[f64], c: Field[f64]) {
                with computation(BACKWARD), interval(1, None) {
                    b = b[0, 0, -1] + a
                    c = c[0, 0, -2]
                }
            }",
        )
        .unwrap();
        let err = pm.execute_plan(&mut ctx, &all(), &[], false).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Ordering(_)));
        assert!(err.message().contains("`b'"), "{err:?}");
        // Validation failed, so the analysis never ran.
        assert!(ctx.extents.is_none());
    }

    #[test]
    fn excluded_passes_do_not_run() {
        let pm = PassManager::default_passes().unwrap();
        let mut ctx = context(
            "stencil s(a: Field[f64], b: Field[f64]) {
                with computation(PARALLEL), interval(...) { b = a[1, 0, 0] }
            }",
        )
        .unwrap();
        pm.execute_plan(&mut ctx, &all(), &["analyze".to_string()], false)
            .unwrap();
        assert!(ctx.extents.is_none());
        pm.execute_plan(&mut ctx, &all(), &[], false).unwrap();
        assert!(ctx.extents.is_some());
    }
}
