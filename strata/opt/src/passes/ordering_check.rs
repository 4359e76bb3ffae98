use crate::analysis::ReadWriteSet;
use crate::traversal::{
    Action, DiagnosticContext, DiagnosticPass, Named, VisResult, Visitor,
};
use std::collections::HashSet;
use strata_ir::{self as ir, Id, Level, Policy, StmtRef};
use strata_utils::Error;

/// Checks that vertical self-references follow the iteration policy of their
/// block.
///
/// A statement may read its own target on planes its block has already
/// visited: below the current plane in FORWARD blocks and above it in
/// BACKWARD blocks. PARALLEL blocks have no order and allow no vertical
/// self-reference at all.
///
/// Reads of values computed on earlier planes must also stay inside the
/// domain on the first plane an interval visits.
#[derive(Default)]
pub struct OrderingCheck {
    /// Fields assigned in the current block.
    writes: HashSet<Id>,
    min_k_size: u64,
    diag: DiagnosticContext,
}

impl Named for OrderingCheck {
    fn name() -> &'static str {
        "ordering-check"
    }

    fn description() -> &'static str {
        "Check that vertical self-references follow the iteration policy"
    }
}

impl DiagnosticPass for OrderingCheck {
    fn diagnostics(&self) -> &DiagnosticContext {
        &self.diag
    }
}

impl OrderingCheck {
    /// Check the read of `field` at vertical offset `dk` on the first plane
    /// interval `iv` visits.
    fn check_first_plane(
        &mut self,
        field: Id,
        dk: i64,
        iv: &ir::Interval,
        block: &ir::ComputationBlock,
        b: usize,
    ) -> Option<Error> {
        // `Some(n)`: the read is inside the domain iff there are at least `n`
        // planes. `None`: the read is outside the domain for every size.
        let needed = match block.policy {
            Policy::Parallel => return None,
            Policy::Forward => {
                let plane = iv.start.offset.checked_add(dk);
                match iv.start.level {
                    Level::Start => plane.filter(|&p| p >= 0).map(|_| 0),
                    Level::End => plane.map(|p| p.min(0).unsigned_abs()),
                }
            }
            Policy::Backward => {
                let plane = iv.end.offset.checked_add(dk);
                match iv.end.level {
                    Level::End => plane.filter(|&p| p <= 0).map(|_| 0),
                    Level::Start => plane.map(|p| p.max(0).unsigned_abs()),
                }
            }
        };
        match needed {
            Some(k) => {
                self.min_k_size = self.min_k_size.max(k);
                None
            }
            None => Some(Error::ordering(format!(
                "`{field}' is read at vertical offset {dk} on the first plane of interval({iv}) in {} block {b}, which lies outside the domain",
                block.policy
            ))),
        }
    }
}

impl Visitor for OrderingCheck {
    fn start_block(
        &mut self,
        block: &ir::ComputationBlock,
        _b: usize,
    ) -> VisResult {
        self.writes = ReadWriteSet::block_writes(block);
        Ok(Action::Continue)
    }

    fn stmt(
        &mut self,
        stmt: &ir::Stmt,
        at: StmtRef,
        block: &ir::ComputationBlock,
    ) -> VisResult {
        let b = at.block;
        for offset in ReadWriteSet::vertical_self_reads(stmt) {
            if block.policy.visits_before(offset.k) {
                continue;
            }
            let reason = match block.policy {
                Policy::Parallel => "planes of a PARALLEL block run in no particular order",
                Policy::Forward => "FORWARD blocks have not computed planes above the current one",
                Policy::Backward => "BACKWARD blocks have not computed planes below the current one",
            };
            self.diag.err(
                Error::ordering(format!(
                    "`{}' reads itself at {offset} in {} block {b}",
                    stmt.target, block.policy
                ))
                .with_pos(stmt)
                .with_post_msg(Some(reason.to_string())),
            );
        }

        let iv = block.intervals[at.interval].interval;
        for (field, offset) in
            ReadWriteSet::carried_reads(stmt, &self.writes, block.policy)
        {
            if let Some(err) =
                self.check_first_plane(field, offset.k, &iv, block, b)
            {
                self.diag.err(err.with_pos(stmt));
            }
        }
        Ok(Action::Continue)
    }

    fn finish(&mut self, ctx: &mut ir::Context) -> VisResult {
        ctx.min_k_size = ctx.min_k_size.max(self.min_k_size);
        Ok(Action::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::context;

    fn check(src: &str) -> (Vec<String>, u64) {
        let mut ctx = context(src).unwrap_or_else(|e| panic!("{e:?}"));
        let mut pass = OrderingCheck::default();
        pass.do_pass(&mut ctx).unwrap();
        let errs = pass
            .diagnostics()
            .errors_iter()
            .map(|e| e.message())
            .collect();
        (errs, ctx.min_k_size)
    }

    fn recurrence(policy: &str, interval: &str, dk: i64) -> String {
        format!(
            "stencil s(a: Field[f64], b: Field[f64]) {{
                with computation({policy}), interval({interval}) {{ b = b[0, 0, {dk}] + a }}
            }}"
        )
    }

    #[test]
    fn forward_reads_below() {
        let (errs, _) = check(&recurrence("FORWARD", "1, None", -1));
        assert!(errs.is_empty(), "{errs:?}");
    }

    #[test]
    fn backward_cannot_read_below() {
        let (errs, _) = check(&recurrence("BACKWARD", "1, None", -1));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].starts_with("Ordering error: `b' reads itself at [0, 0, -1]"));
        assert!(errs[0].contains("BACKWARD block 0"));
    }

    #[test]
    fn parallel_has_no_order() {
        let (errs, _) = check(&recurrence("PARALLEL", "...", 1));
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn first_plane_stays_in_domain() {
        let (errs, _) = check(&recurrence("FORWARD", "...", -1));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("outside the domain"));

        let (errs, _) = check(&recurrence("BACKWARD", "0, -2", 2));
        assert!(errs.is_empty(), "{errs:?}");
        let (errs, _) = check(&recurrence("BACKWARD", "0, -1", 2));
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn top_anchored_intervals_raise_min_k_size() {
        // The first plane is K - 1, reading K - 3 needs three planes.
        let (errs, k) = check(&recurrence("FORWARD", "-1, None", -2));
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(k, 3);
        // The first plane is 1, reading 3 needs four planes.
        let (errs, k) = check(&recurrence("BACKWARD", "0, 2", 2));
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(k, 4);
    }

    #[test]
    fn extreme_offsets_do_not_overflow() {
        let (errs, k) = check(&recurrence("FORWARD", "-9223372036854775807, None", -1));
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(k, 1 << 63);
        let (errs, _) = check(&recurrence("FORWARD", "-9223372036854775807, None", -2));
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("outside the domain"), "{}", errs[0]);
        let (errs, _) = check(&recurrence("BACKWARD", "0, 9223372036854775807", 1));
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn carried_reads_of_other_fields() {
        let (errs, _) = check(
            "stencil s(a: Field[f64], b: Field[f64], c: Field[f64]) {
                with computation(FORWARD), interval(...) {
                    c = b[0, 0, -1]
                    b = a
                }
            }",
        );
        assert_eq!(errs.len(), 1);
        assert!(errs[0].contains("`b' is read at vertical offset -1"));
    }
}
