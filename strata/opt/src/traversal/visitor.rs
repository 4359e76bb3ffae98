//! Implements a visitor for stencils.
//! Passes implemented as a Visitor are directly invoked on an
//! [`ir::Context`] using [`Visitor::do_pass`].
use super::action::{Action, VisResult};
use super::Order;
use strata_ir::{self as ir, ComputationBlock, IntervalBlock, StmtRef};
use strata_utils::StrataResult;

/// Trait that describes named things. Calling [`do_pass`](Visitor::do_pass)
/// and [`do_pass_default`](Visitor::do_pass_default) requires this to be
/// implemented.
///
/// This has to be a separate trait from [`Visitor`] because these methods
/// don't recieve `self` which means that it is impossible to create dynamic
/// trait objects.
pub trait Named {
    /// The name of a pass. Is used for identifying passes.
    fn name() -> &'static str;
    /// A short description of the pass.
    fn description() -> &'static str;
}

/// Trait defining method that can be used to construct a Visitor from an
/// [ir::Context].
/// This is useful when a pass needs to construct information using the
/// context *before* visiting the stencil.
///
/// For passes that don't need to use the context, this trait is
/// automatically derived from [Default].
pub trait ConstructVisitor {
    /// Construct the visitor using information from the Context
    fn from(_ctx: &ir::Context) -> StrataResult<Self>
    where
        Self: Sized;

    /// Clear the data stored in the visitor.
    fn clear_data(&mut self);
}

/// Derive ConstructVisitor when [Default] is provided for a visitor.
impl<T: Default + Sized + Visitor> ConstructVisitor for T {
    fn from(_ctx: &ir::Context) -> StrataResult<Self> {
        Ok(T::default())
    }

    fn clear_data(&mut self) {
        *self = T::default();
    }
}

/// The visiting interface for a stencil.
/// Contains two kinds of functions:
/// 1. start_<node>: Called when visiting <node> top-down.
/// 2. finish_<node>: Called when visiting <node> bottom-up.
///
/// A pass will usually override one or more function and rely on the default
/// visitors to automatically visit the children.
pub trait Visitor {
    /// Precondition for this pass to run on the program. If this function
    /// returns None, the pass triggers. Otherwise it aborts and logs the
    /// string as the reason.
    fn precondition(_ctx: &ir::Context) -> Option<String>
    where
        Self: Sized,
    {
        None
    }

    /// Define the order in which blocks, intervals and statements are
    /// visited.
    #[inline(always)]
    fn iteration_order() -> Order
    where
        Self: Sized,
    {
        Order::Execution
    }

    /// Run the visitor on a given [`ir::Context`].
    /// Calls [Visitor::start], visits every block, and finally calls
    /// [Visitor::finish].
    fn do_pass(&mut self, ctx: &mut ir::Context) -> StrataResult<()>
    where
        Self: Sized + ConstructVisitor + Named,
    {
        if let Some(msg) = Self::precondition(&*ctx) {
            log::info!("Skipping `{}': {msg}", Self::name());
            return Ok(());
        }

        self.start(ctx)?
            .and_then(|| {
                let blocks = &ctx.stencil.blocks;
                for b in Self::iteration_order().indices(blocks.len()) {
                    if self.visit_block(&blocks[b], b)? == Action::Stop {
                        return Ok(Action::Stop);
                    }
                }
                Ok(Action::Continue)
            })?
            .and_then(|| self.finish(ctx))?;
        Ok(())
    }

    /// Build a [Default] implementation of this pass and call
    /// [Visitor::do_pass] using it.
    #[inline(always)]
    fn do_pass_default(ctx: &mut ir::Context) -> StrataResult<Self>
    where
        Self: ConstructVisitor + Sized + Named,
    {
        let mut visitor = Self::from(&*ctx)?;
        visitor.do_pass(ctx)?;
        Ok(visitor)
    }

    /// Visit a computation block and its children.
    fn visit_block(
        &mut self,
        block: &ComputationBlock,
        b: usize,
    ) -> VisResult
    where
        Self: Sized,
    {
        let order = Self::iteration_order();
        Ok(self
            .start_block(block, b)?
            .and_then(|| {
                for i in order.indices(block.intervals.len()) {
                    let iv = &block.intervals[i];
                    let act = self
                        .start_interval(iv, block, b, i)?
                        .and_then(|| {
                            for s in order.indices(iv.stmts.len()) {
                                let at = StmtRef {
                                    block: b,
                                    interval: i,
                                    stmt: s,
                                };
                                if self.stmt(&iv.stmts[s], at, block)?
                                    == Action::Stop
                                {
                                    return Ok(Action::Stop);
                                }
                            }
                            Ok(Action::Continue)
                        })?
                        .pop();
                    if act == Action::Stop {
                        return Ok(Action::Stop);
                    }
                }
                Ok(Action::Continue)
            })?
            .and_then(|| self.finish_block(block, b))?
            .pop())
    }

    /// Executed before the traversal begins.
    fn start(&mut self, _ctx: &mut ir::Context) -> VisResult {
        Ok(Action::Continue)
    }

    /// Executed after the traversal ends. Skipped if a node returned
    /// [Action::Stop].
    fn finish(&mut self, _ctx: &mut ir::Context) -> VisResult {
        Ok(Action::Continue)
    }

    /// Executed before visiting the intervals of a computation block.
    fn start_block(
        &mut self,
        _block: &ComputationBlock,
        _b: usize,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    /// Executed after visiting the intervals of a computation block.
    fn finish_block(
        &mut self,
        _block: &ComputationBlock,
        _b: usize,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    /// Executed before visiting the statements of an interval block.
    fn start_interval(
        &mut self,
        _iv: &IntervalBlock,
        _block: &ComputationBlock,
        _b: usize,
        _i: usize,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    /// Executed at every statement.
    fn stmt(
        &mut self,
        _stmt: &ir::Stmt,
        _at: StmtRef,
        _block: &ComputationBlock,
    ) -> VisResult {
        Ok(Action::Continue)
    }
}
