//! A point-by-point interpreter of the IR.
//!
//! Every statement is kept as an expression tree and evaluated separately at
//! every grid point of its region. Slow, but simple enough to serve as the
//! reference the other backends are checked against.
use crate::kernel::ScheduledKernel;
use crate::schedule::{Schedule, StageBody};
use crate::{Backend, BackendKind, Frame, Interface, Kernel, Region};
use std::io;
use strata_ir::{self as ir, BinaryOp, Expr, Offset, UnaryOp};
use strata_utils::{Error, StrataResult};

/// Expression tree with names replaced by field and scalar numbers.
#[derive(Clone, Debug, PartialEq)]
enum Node {
    Field { slot: usize, offset: Offset },
    Scalar(usize),
    Const(f64),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Select {
        cond: Box<Node>,
        then: Box<Node>,
        els: Box<Node>,
    },
}

impl Node {
    fn lower(expr: &Expr, iface: &Interface) -> StrataResult<Self> {
        Ok(match expr {
            Expr::Field { name, offset } => Node::Field {
                slot: iface.slot(name).ok_or_else(|| {
                    Error::backend(format!("read of undeclared field `{name}'"))
                })?,
                offset: *offset,
            },
            Expr::Scalar(name) => {
                Node::Scalar(iface.scalar_slot(name).ok_or_else(|| {
                    Error::backend(format!("read of undeclared scalar `{name}'"))
                })?)
            }
            Expr::Lit(lit) => Node::Const(lit.as_f64()),
            Expr::Unary { op, arg } => {
                Node::Unary(*op, Box::new(Self::lower(arg, iface)?))
            }
            Expr::Binary { op, lhs, rhs } => Node::Binary(
                *op,
                Box::new(Self::lower(lhs, iface)?),
                Box::new(Self::lower(rhs, iface)?),
            ),
            Expr::Cond { cond, then, els } => Node::Select {
                cond: Box::new(Self::lower(cond, iface)?),
                then: Box::new(Self::lower(then, iface)?),
                els: Box::new(Self::lower(els, iface)?),
            },
        })
    }

    fn eval_at(&self, frame: &Frame<'_>, p: [i64; 3]) -> StrataResult<f64> {
        Ok(match self {
            Node::Field { slot, offset } => {
                frame.read(*slot, [p[0] + offset.i, p[1] + offset.j, p[2] + offset.k])?
            }
            Node::Scalar(slot) => frame.scalar(*slot),
            Node::Const(v) => *v,
            Node::Unary(op, arg) => op.apply(arg.eval_at(frame, p)?),
            Node::Binary(op, lhs, rhs) => {
                op.apply(lhs.eval_at(frame, p)?, rhs.eval_at(frame, p)?)
            }
            // Both branches are read, as in the vector backend.
            Node::Select { cond, then, els } => {
                let then = then.eval_at(frame, p)?;
                let els = els.eval_at(frame, p)?;
                if cond.eval_at(frame, p)? != 0.0 { then } else { els }
            }
        })
    }

    fn write(&self, f: &mut dyn io::Write) -> io::Result<()> {
        match self {
            Node::Field { slot, offset } => write!(f, "f{slot}{offset}"),
            Node::Scalar(slot) => write!(f, "s{slot}"),
            Node::Const(v) => write!(f, "{v:?}"),
            Node::Unary(op, arg) => {
                write!(f, "({op:?} ")?;
                arg.write(f)?;
                write!(f, ")")
            }
            Node::Binary(op, lhs, rhs) => {
                write!(f, "({op:?} ")?;
                lhs.write(f)?;
                write!(f, " ")?;
                rhs.write(f)?;
                write!(f, ")")
            }
            Node::Select { cond, then, els } => {
                write!(f, "(select ")?;
                cond.write(f)?;
                write!(f, " ")?;
                then.write(f)?;
                write!(f, " ")?;
                els.write(f)?;
                write!(f, ")")
            }
        }
    }
}

impl StageBody for Node {
    fn eval(
        &self,
        frame: &Frame<'_>,
        region: &Region,
        out: &mut Vec<f64>,
    ) -> StrataResult<()> {
        out.reserve(region.len());
        for p in region.points() {
            out.push(self.eval_at(frame, p)?);
        }
        Ok(())
    }

    fn write_text(&self, f: &mut dyn io::Write) -> io::Result<()> {
        write!(f, "    ")?;
        self.write(f)?;
        writeln!(f)
    }
}

/// Backend that interprets the IR one grid point at a time.
#[derive(Default, Debug, Clone, Copy)]
pub struct DebugBackend;

impl Backend for DebugBackend {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn compile(&self, ctx: &ir::Context) -> StrataResult<Box<dyn Kernel>> {
        let iface = Interface::new(ctx)?;
        let schedule =
            Schedule::build(ctx, &iface, |stmt| Node::lower(&stmt.value, &iface))?;
        Ok(Box::new(ScheduledKernel::new(
            BackendKind::Debug,
            iface,
            schedule,
        )))
    }
}
