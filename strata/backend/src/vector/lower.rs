//! Lowering of statements into register programs.
use crate::Interface;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt::{self, Display};
use strata_ir::{BinaryOp, Expr, Offset, UnaryOp};
use strata_utils::{Error, StrataResult};

/// Number of the instruction whose result a register holds.
pub type Reg = usize;

#[derive(Clone, Debug, PartialEq)]
pub enum Instr {
    /// Field `slot` at every point of the region moved by `offset`.
    Load { slot: usize, offset: Offset },
    Scalar(usize),
    Const(f64),
    Unary(UnaryOp, Reg),
    Binary(BinaryOp, Reg, Reg),
    /// Pick from the second register where the first is non-zero, from the
    /// third elsewhere.
    Select(Reg, Reg, Reg),
}

impl Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Load { slot, offset } => write!(f, "load f{slot}{offset}"),
            Instr::Scalar(slot) => write!(f, "scalar s{slot}"),
            Instr::Const(v) => write!(f, "const {v:?}"),
            Instr::Unary(op, r) => write!(f, "{op:?} %{r}"),
            Instr::Binary(op, l, r) => write!(f, "{op:?} %{l}, %{r}"),
            Instr::Select(c, t, e) => write!(f, "select %{c}, %{t}, %{e}"),
        }
    }
}

/// Straight-line code computing one statement. Instruction `n` writes
/// register `n`.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub code: SmallVec<[Instr; 8]>,
    pub result: Reg,
}

/// Builds a [Program], reusing the register of a load that was already
/// emitted for the same field and offset.
struct Lowering<'a> {
    iface: &'a Interface,
    code: SmallVec<[Instr; 8]>,
    loads: HashMap<(usize, Offset), Reg>,
}

impl Lowering<'_> {
    fn push(&mut self, instr: Instr) -> Reg {
        self.code.push(instr);
        self.code.len() - 1
    }

    fn expr(&mut self, expr: &Expr) -> StrataResult<Reg> {
        Ok(match expr {
            Expr::Field { name, offset } => {
                let slot = self.iface.slot(name).ok_or_else(|| {
                    Error::backend(format!("read of undeclared field `{name}'"))
                })?;
                if let Some(reg) = self.loads.get(&(slot, *offset)) {
                    return Ok(*reg);
                }
                let reg = self.push(Instr::Load {
                    slot,
                    offset: *offset,
                });
                self.loads.insert((slot, *offset), reg);
                reg
            }
            Expr::Scalar(name) => {
                let slot = self.iface.scalar_slot(name).ok_or_else(|| {
                    Error::backend(format!("read of undeclared scalar `{name}'"))
                })?;
                self.push(Instr::Scalar(slot))
            }
            Expr::Lit(lit) => self.push(Instr::Const(lit.as_f64())),
            Expr::Unary { op, arg } => {
                let arg = self.expr(arg)?;
                self.push(Instr::Unary(*op, arg))
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.expr(lhs)?;
                let rhs = self.expr(rhs)?;
                self.push(Instr::Binary(*op, lhs, rhs))
            }
            Expr::Cond { cond, then, els } => {
                let cond = self.expr(cond)?;
                let then = self.expr(then)?;
                let els = self.expr(els)?;
                self.push(Instr::Select(cond, then, els))
            }
        })
    }
}

impl Program {
    pub fn lower(expr: &Expr, iface: &Interface) -> StrataResult<Self> {
        let mut lowering = Lowering {
            iface,
            code: SmallVec::new(),
            loads: HashMap::new(),
        };
        let result = lowering.expr(expr)?;
        Ok(Self {
            code: lowering.code,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::analyzed;

    #[test]
    fn loads_are_shared() {
        let ctx = analyzed(
            "stencil lap(a: Field[f64], b: Field[f64]) {
                with computation(PARALLEL), interval(...) {
                    b = a[1, 0, 0] + a[-1, 0, 0] - 2.0 * a + a[1, 0, 0] * a
                }
            }",
        );
        let iface = Interface::new(&ctx).unwrap();
        let (_, stmt) = ctx.stencil.statements().next().unwrap();
        let prog = Program::lower(&stmt.value, &iface).unwrap();
        let loads = prog
            .code
            .iter()
            .filter(|i| matches!(i, Instr::Load { .. }))
            .count();
        assert_eq!(loads, 3);
        assert_eq!(prog.result, prog.code.len() - 1);
        assert_eq!(
            prog.code[0],
            Instr::Load {
                slot: 0,
                offset: Offset::new(1, 0, 0)
            }
        );
        assert_eq!(prog.code[0].to_string(), "load f0[1, 0, 0]");
    }
}
