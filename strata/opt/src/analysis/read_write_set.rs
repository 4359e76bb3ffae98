use itertools::Itertools;
use std::collections::HashSet;
use strata_ir::{self as ir, Id, Offset, Policy};

/// Calcuate the reads-from and writes-to sets of statements.
pub struct ReadWriteSet;

impl ReadWriteSet {
    /// Fields read by `stmt`, each with the offset of the read.
    pub fn reads(stmt: &ir::Stmt) -> Vec<(Id, Offset)> {
        stmt.value.reads()
    }

    /// Names of the fields read anywhere in the statements.
    pub fn read_set<'a>(
        stmts: impl Iterator<Item = &'a ir::Stmt> + 'a,
    ) -> impl Iterator<Item = Id> + 'a {
        stmts
            .flat_map(|stmt| Self::reads(stmt).into_iter().map(|(f, _)| f))
            .unique()
    }

    /// Names of the fields assigned by the statements.
    pub fn write_set<'a>(
        stmts: impl Iterator<Item = &'a ir::Stmt> + 'a,
    ) -> impl Iterator<Item = Id> + 'a {
        stmts.map(|stmt| stmt.target).unique()
    }

    /// Fields assigned anywhere in `block`.
    pub fn block_writes(block: &ir::ComputationBlock) -> HashSet<Id> {
        Self::write_set(block.intervals.iter().flat_map(|iv| iv.stmts.iter()))
            .collect()
    }

    /// Reads of the statement's own target at a nonzero vertical offset.
    pub fn vertical_self_reads(stmt: &ir::Stmt) -> Vec<Offset> {
        Self::reads(stmt)
            .into_iter()
            .filter(|(f, o)| *f == stmt.target && o.k != 0)
            .map(|(_, o)| o)
            .collect()
    }

    /// Reads of fields in `writes` at vertical offsets that `policy` visits
    /// before the current plane. Inside a sequential block these reads see
    /// values the block computed itself.
    pub fn carried_reads(
        stmt: &ir::Stmt,
        writes: &HashSet<Id>,
        policy: Policy,
    ) -> Vec<(Id, Offset)> {
        Self::reads(stmt)
            .into_iter()
            .filter(|(f, o)| writes.contains(f) && policy.visits_before(o.k))
            .collect()
    }
}
