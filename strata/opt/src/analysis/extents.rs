//! Infers how far around the domain every field is accessed.
//!
//! Demands flow backwards: outputs are needed on the domain itself, and a
//! statement `t = f[o] + ...` evaluated over the horizontal extent of `t`
//! needs `f` on that extent shifted by `o`. Vertically a statement only runs
//! on the planes of its interval. Statements are therefore visited from the last
//! one to the first.
//!
//! Sequential blocks read values they computed on earlier planes. Those reads
//! do not touch planes outside the domain, so their vertical offset is
//! dropped, but their horizontal offset still widens the region the writer
//! has to compute. Because the writer may come after the reader, a sequential
//! block is revisited with the demands of such reads until they stop growing.
use super::ReadWriteSet;
use crate::traversal::Order;
use itertools::Itertools;
use linked_hash_map::LinkedHashMap;
use std::collections::{HashMap, HashSet};
use strata_ir::{
    self as ir, Extent, ExtentMap, FieldExtent, Id, StmtRef,
};
use strata_utils::{Error, StrataResult};

/// Demands of loop-carried reads, keyed by the field that is read.
type Carried = HashMap<Id, Extent>;

fn merge(map: &mut HashMap<Id, Extent>, field: Id, ext: Extent) -> bool {
    match map.get_mut(&field) {
        Some(cur) => {
            let grown = cur.union(&ext);
            let changed = grown != *cur;
            *cur = grown;
            changed
        }
        None => {
            map.insert(field, ext);
            true
        }
    }
}

#[derive(Default)]
pub struct ExtentAnalysis {
    /// Demand on every field seen so far.
    fields: HashMap<Id, Extent>,
    /// Vertical offsets of loop-carried reads.
    seq_deps: HashMap<Id, (i64, i64)>,
    /// Compute extents of the statements found live so far.
    stmts: HashMap<StmtRef, Extent>,
}

impl ExtentAnalysis {
    /// Compute the extents of every field and statement of `stencil`.
    ///
    /// Fails with an ordering error if a sequential block needs a region that
    /// keeps growing with the number of planes it visits.
    pub fn compute(stencil: &ir::Stencil) -> StrataResult<ExtentMap> {
        let mut analysis = ExtentAnalysis::default();
        for field in stencil.outputs() {
            analysis.fields.insert(field.name, Extent::zero());
        }

        for b in Order::Reverse.indices(stencil.blocks.len()) {
            let block = &stencil.blocks[b];
            if block.policy.is_sequential() {
                analysis.sequential_block(stencil, block, b)?;
            } else {
                analysis.visit_block(block, b, &HashSet::new())?;
            }
        }

        Ok(analysis.into_map(stencil))
    }

    /// Revisit a sequential block until the demands of its loop-carried
    /// reads reach a fixed point.
    fn sequential_block(
        &mut self,
        stencil: &ir::Stencil,
        block: &ir::ComputationBlock,
        b: usize,
    ) -> StrataResult<()> {
        let writes = ReadWriteSet::block_writes(block);
        let entry = self.fields.clone();
        let mut seeds = Carried::new();
        let mut grown = Vec::new();

        // Demands are sums of offsets along paths through the fields. A path
        // longer than the number of fields repeats one, so after that many
        // passes any further growth comes from a cycle.
        for pass in 0..stencil.fields.len() + 2 {
            self.fields = entry.clone();
            for (field, ext) in &seeds {
                merge(&mut self.fields, *field, *ext);
            }
            let carried = self.visit_block(block, b, &writes)?;
            grown = carried
                .into_iter()
                .filter_map(|(field, ext)| {
                    merge(&mut seeds, field, ext).then_some(field)
                })
                .sorted()
                .collect();
            if grown.is_empty() {
                log::debug!("block {b}: extents settled after {} passes", pass + 1);
                return Ok(());
            }
        }

        Err(Error::ordering(format!(
            "the region needed of `{}' grows with every plane visited by {} block {b}",
            grown.iter().join("', `"),
            block.policy,
        ))
        .with_pos(block))
    }

    /// Visit the statements of `block` from last to first. Returns the
    /// demands of reads of `writes` that look at planes visited earlier.
    ///
    /// A statement is evaluated on the planes of its interval only, so its
    /// compute extent never reaches into the vertical halo.
    fn visit_block(
        &mut self,
        block: &ir::ComputationBlock,
        b: usize,
        writes: &HashSet<Id>,
    ) -> StrataResult<Carried> {
        let mut carried = Carried::new();
        for i in Order::Reverse.indices(block.intervals.len()) {
            let iv = &block.intervals[i];
            for s in Order::Reverse.indices(iv.stmts.len()) {
                let stmt = &iv.stmts[s];
                let at = StmtRef {
                    block: b,
                    interval: i,
                    stmt: s,
                };
                let Some(target) = self.fields.get(&stmt.target) else {
                    self.stmts.remove(&at);
                    continue;
                };
                let compute = target.horizontal();
                self.stmts.insert(at, compute);

                for (field, offset) in ReadWriteSet::reads(stmt) {
                    let shift = |offset: ir::Offset| {
                        compute.checked_shift(offset).ok_or_else(|| {
                            Error::grammar(format!(
                                "`{field}' is read at {offset}, too far from the domain"
                            ))
                            .with_pos(stmt)
                        })
                    };
                    if writes.contains(&field)
                        && block.policy.visits_before(offset.k)
                    {
                        let ext = shift(offset.horizontal())?;
                        merge(&mut carried, field, ext);
                        merge(&mut self.fields, field, ext);
                        self.seq_deps
                            .entry(field)
                            .and_modify(|(lo, hi)| {
                                *lo = (*lo).min(offset.k);
                                *hi = (*hi).max(offset.k);
                            })
                            .or_insert((offset.k, offset.k));
                    } else {
                        merge(&mut self.fields, field, shift(offset)?);
                    }
                }
            }
        }
        Ok(carried)
    }

    fn into_map(self, stencil: &ir::Stencil) -> ExtentMap {
        let fields: LinkedHashMap<Id, FieldExtent> = stencil
            .fields
            .keys()
            .filter_map(|name| {
                let extent = *self.fields.get(name)?;
                let seq_dep = self.seq_deps.get(name).copied();
                log::debug!("{}.{name}: {extent}", stencil.name);
                Some((*name, FieldExtent { extent, seq_dep }))
            })
            .collect();
        let num_stmts = stencil.statements().count();
        let map = ExtentMap::new(fields, self.stmts, num_stmts);
        if map.num_dead() > 0 {
            log::info!(
                "{}: {} of {num_stmts} statements are never used",
                stencil.name,
                map.num_dead()
            );
        }
        map
    }
}
