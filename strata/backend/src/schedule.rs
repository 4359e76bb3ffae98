//! Execution order shared by all backends.
//!
//! A [Schedule] mirrors the blocks and intervals of a stencil but only keeps
//! live statements, each lowered by a backend into a [StageBody].
use crate::{Frame, Interface, Region};
use std::io;
use strata_ir::{self as ir, Extent, Interval, Policy, StmtRef};
use strata_utils::{Error, StrataResult};

/// Backend specific code for one statement.
pub trait StageBody: Send + Sync {
    /// Append the value of the statement at every point of `region` to `out`.
    fn eval(
        &self,
        frame: &Frame<'_>,
        region: &Region,
        out: &mut Vec<f64>,
    ) -> StrataResult<()>;

    /// Print the lowered code.
    fn write_text(&self, f: &mut dyn io::Write) -> io::Result<()>;
}

/// One live statement.
pub struct Stage<B> {
    /// Field number of the target in the [Interface].
    pub target: usize,
    /// Compute extent of the statement.
    pub extent: Extent,
    pub body: B,
    /// The statement as source text.
    pub text: String,
}

pub struct IntervalStages<B> {
    pub interval: Interval,
    pub stages: Vec<Stage<B>>,
}

pub struct BlockSchedule<B> {
    pub policy: Policy,
    pub intervals: Vec<IntervalStages<B>>,
}

pub struct Schedule<B> {
    pub blocks: Vec<BlockSchedule<B>>,
}

impl<B: StageBody> Schedule<B> {
    /// Lower every live statement of `ctx` with `lower`.
    pub fn build<F>(
        ctx: &ir::Context,
        iface: &Interface,
        mut lower: F,
    ) -> StrataResult<Self>
    where
        F: FnMut(&ir::Stmt) -> StrataResult<B>,
    {
        let extents = ctx.extents()?;
        let mut blocks = Vec::with_capacity(ctx.stencil.blocks.len());
        for (b, block) in ctx.stencil.blocks.iter().enumerate() {
            let mut intervals = Vec::with_capacity(block.intervals.len());
            for (i, iv) in block.intervals.iter().enumerate() {
                let mut stages = Vec::with_capacity(iv.stmts.len());
                for (s, stmt) in iv.stmts.iter().enumerate() {
                    let at = StmtRef {
                        block: b,
                        interval: i,
                        stmt: s,
                    };
                    let Some(extent) = extents.compute_extent(at) else {
                        log::debug!("{at}: `{}' is never read, skipping", stmt.target);
                        continue;
                    };
                    let target = iface.slot(&stmt.target).ok_or_else(|| {
                        Error::backend(format!(
                            "`{}' is assigned but not declared",
                            stmt.target
                        ))
                        .with_pos(stmt)
                    })?;
                    stages.push(Stage {
                        target,
                        extent,
                        body: lower(stmt)?,
                        text: format!(
                            "{} = {}",
                            stmt.target,
                            ir::Printer::format_expr(&stmt.value)
                        ),
                    });
                }
                intervals.push(IntervalStages {
                    interval: iv.interval,
                    stages,
                });
            }
            blocks.push(BlockSchedule {
                policy: block.policy,
                intervals,
            });
        }
        Ok(Self { blocks })
    }

    /// Run every block in order over `domain`.
    pub fn execute(
        &self,
        frame: &mut Frame<'_>,
        domain: [usize; 3],
    ) -> StrataResult<()> {
        let mut scratch = Vec::new();
        for block in &self.blocks {
            for iv in &block.intervals {
                let planes = iv.interval.resolve(domain[2] as u64);
                let regions = iv
                    .stages
                    .iter()
                    .map(|stage| Region::grown(&stage.extent, domain, planes.clone()))
                    .collect::<Vec<_>>();
                match block.policy {
                    Policy::Parallel => {
                        for (stage, region) in iv.stages.iter().zip(&regions) {
                            Self::run_stage(stage, frame, region, &mut scratch)?;
                        }
                    }
                    Policy::Forward => {
                        for k in planes {
                            Self::run_plane(iv, &regions, frame, k, &mut scratch)?;
                        }
                    }
                    Policy::Backward => {
                        for k in planes.rev() {
                            Self::run_plane(iv, &regions, frame, k, &mut scratch)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Run every stage of `iv` on plane `k` of its region.
    fn run_plane(
        iv: &IntervalStages<B>,
        regions: &[Region],
        frame: &mut Frame<'_>,
        k: i64,
        scratch: &mut Vec<f64>,
    ) -> StrataResult<()> {
        for (stage, region) in iv.stages.iter().zip(regions) {
            Self::run_stage(stage, frame, &region.plane(k), scratch)?;
        }
        Ok(())
    }

    /// Evaluate `stage` over `region` and store the results only once every
    /// point is computed.
    fn run_stage(
        stage: &Stage<B>,
        frame: &mut Frame<'_>,
        region: &Region,
        scratch: &mut Vec<f64>,
    ) -> StrataResult<()> {
        if region.is_empty() {
            return Ok(());
        }
        scratch.clear();
        stage.body.eval(frame, region, scratch)?;
        frame.commit(stage.target, region, scratch)
    }

    /// Print the schedule with each stage's lowered code.
    pub fn write_text(&self, f: &mut dyn io::Write) -> io::Result<()> {
        for (b, block) in self.blocks.iter().enumerate() {
            writeln!(f, "block {b} ({}):", block.policy)?;
            for iv in &block.intervals {
                writeln!(f, "  interval({}):", iv.interval)?;
                for stage in &iv.stages {
                    writeln!(f, "    # {}  @ {}", stage.text, stage.extent)?;
                    stage.body.write_text(f)?;
                }
            }
        }
        Ok(())
    }
}
