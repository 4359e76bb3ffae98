use crate::traversal::{
    Action, DiagnosticContext, DiagnosticPass, Named, VisResult, Visitor,
};
use itertools::Itertools;
use std::cmp::Ordering;
use strata_ir::{self as ir, Policy};
use strata_utils::Error;

/// Checks the vertical ranges of every computation block:
/// 1. Every interval is non-empty on large enough domains.
/// 2. Intervals of one block do not overlap.
/// 3. FORWARD blocks list their intervals bottom to top, BACKWARD blocks top
///    to bottom.
///
/// Also computes the smallest vertical domain for which all of the above
/// holds and raises [ir::Context::min_k_size] to it.
#[derive(Default)]
pub struct IntervalCheck {
    min_k_size: u64,
    diag: DiagnosticContext,
}

impl Named for IntervalCheck {
    fn name() -> &'static str {
        "interval-check"
    }

    fn description() -> &'static str {
        "Check that intervals are non-empty, disjoint and ordered"
    }
}

impl DiagnosticPass for IntervalCheck {
    fn diagnostics(&self) -> &DiagnosticContext {
        &self.diag
    }
}

impl IntervalCheck {
    fn raise(&mut self, k_size: u64) {
        self.min_k_size = self.min_k_size.max(k_size);
    }
}

impl Visitor for IntervalCheck {
    fn start_block(
        &mut self,
        block: &ir::ComputationBlock,
        b: usize,
    ) -> VisResult {
        let mut well_formed = true;
        for iv in &block.intervals {
            match iv.interval.min_k_size() {
                Ok(Some(k)) => self.raise(k),
                Err(err) => {
                    well_formed = false;
                    self.diag.err(err.with_pos(iv));
                }
                Ok(None) => {
                    well_formed = false;
                    self.diag.err(
                        Error::interval(format!(
                            "interval({}) of block {b} is empty",
                            iv.interval
                        ))
                        .with_pos(iv),
                    );
                }
            }
        }
        if !well_formed {
            return Ok(Action::SkipChildren);
        }

        let by_position = block
            .intervals
            .iter()
            .sorted_by(|x, y| x.interval.cmp_position(&y.interval))
            .collect_vec();
        for (lo, hi) in by_position.iter().tuple_windows() {
            match lo.interval.min_k_size_before(&hi.interval) {
                Ok(Some(k)) => self.raise(k),
                Err(err) => {
                    well_formed = false;
                    self.diag.err(err.with_pos(*hi));
                }
                Ok(None) => {
                    well_formed = false;
                    self.diag.err(
                        Error::interval(format!(
                            "interval({}) overlaps interval({}) in {} block {b}",
                            hi.interval, lo.interval, block.policy
                        ))
                        .with_pos(*hi),
                    );
                }
            }
        }
        if !well_formed {
            return Ok(Action::SkipChildren);
        }

        let expected = match block.policy {
            Policy::Parallel => return Ok(Action::SkipChildren),
            Policy::Forward => Ordering::Less,
            Policy::Backward => Ordering::Greater,
        };
        for (prev, next) in block.intervals.iter().tuple_windows() {
            if prev.interval.cmp_position(&next.interval) != expected {
                let direction = if expected == Ordering::Less {
                    "upwards"
                } else {
                    "downwards"
                };
                self.diag.err(
                    Error::interval(format!(
                        "interval({}) is listed after interval({}) but {} block {b} visits planes {direction}",
                        next.interval, prev.interval, block.policy
                    ))
                    .with_pos(next),
                );
            }
        }
        Ok(Action::SkipChildren)
    }

    fn finish(&mut self, ctx: &mut ir::Context) -> VisResult {
        if self.min_k_size > ctx.min_k_size {
            log::debug!(
                "{} needs at least {} vertical levels",
                ctx.stencil.name,
                self.min_k_size
            );
            ctx.min_k_size = self.min_k_size;
        }
        Ok(Action::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::context;
    use strata_utils::ErrorKind;

    fn check(src: &str) -> (IntervalCheck, ir::Context) {
        let mut ctx = context(src).unwrap_or_else(|e| panic!("{e:?}"));
        let mut pass = IntervalCheck::default();
        pass.do_pass(&mut ctx).unwrap();
        (pass, ctx)
    }

    fn errors(pass: &IntervalCheck) -> Vec<String> {
        pass.diagnostics().errors_iter().map(|e| e.message()).collect()
    }

    #[test]
    fn disjoint_partial_intervals_are_legal() {
        let (pass, ctx) = check(
            "stencil s(a: Field[f64], b: Field[f64]) {
                with computation(FORWARD) {
                    interval(0, 1) { b = a }
                    interval(3, -2) { b = a + 1 }
                }
            }",
        );
        assert!(errors(&pass).is_empty());
        // [3, K - 2) is non-empty from K = 6 on.
        assert_eq!(ctx.min_k_size, 6);
    }

    #[test]
    fn overlapping_intervals() {
        let (pass, _) = check(
            "stencil s(a: Field[f64], b: Field[f64]) {
                with computation(FORWARD) {
                    interval(0, 3) { b = a }
                    interval(2, None) { b = a + 1 }
                }
            }",
        );
        let errs = errors(&pass);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("overlaps"), "{}", errs[0]);
        assert!(pass
            .diagnostics()
            .errors_iter()
            .all(|e| matches!(e.kind(), ErrorKind::Interval(_))));
    }

    #[test]
    fn empty_interval() {
        let (pass, _) = check(
            "stencil s(a: Field[f64], b: Field[f64]) {
                with computation(PARALLEL), interval(-1, 1) { b = a }
            }",
        );
        assert!(errors(&pass)[0].contains("is empty"));
    }

    #[test]
    fn far_apart_bounds_are_reported() {
        let (pass, _) = check(
            "stencil s(a: Field[f64], b: Field[f64]) {
                with computation(PARALLEL), interval(1, -9223372036854775807) { b = a }
            }",
        );
        let errs = errors(&pass);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("too far apart"), "{}", errs[0]);
    }

    #[test]
    fn visiting_order() {
        let (pass, _) = check(
            "stencil s(a: Field[f64], b: Field[f64]) {
                with computation(BACKWARD) {
                    interval(-1, None) { b = a }
                    interval(0, -1) { b = a + b[0, 0, 1] }
                }
                with computation(FORWARD) {
                    interval(1, None) { b = a }
                    interval(0, 1) { b = 2 * a }
                }
            }",
        );
        let errs = errors(&pass);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("FORWARD block 1"), "{}", errs[0]);
    }

    #[test]
    fn bottom_and_top_levels() {
        let (pass, ctx) = check(
            "stencil s(a: Field[f64], b: Field[f64]) {
                with computation(PARALLEL) {
                    interval(0, 2) { b = a }
                    interval(-1, None) { b = a + 1 }
                }
            }",
        );
        assert!(errors(&pass).is_empty());
        assert_eq!(ctx.min_k_size, 3);
    }
}
