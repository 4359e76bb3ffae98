//! Evaluation of register programs over whole regions.
use super::lower::{Instr, Program};
use crate::schedule::StageBody;
use crate::{Frame, Region};
use std::io;
use strata_utils::StrataResult;

impl StageBody for Program {
    fn eval(
        &self,
        frame: &Frame<'_>,
        region: &Region,
        out: &mut Vec<f64>,
    ) -> StrataResult<()> {
        let n = region.len();
        let mut regs: Vec<Vec<f64>> = Vec::with_capacity(self.code.len());
        for instr in &self.code {
            let value = match instr {
                Instr::Load { slot, offset } => {
                    let mut v = Vec::with_capacity(n);
                    frame.gather(*slot, *offset, region, &mut v)?;
                    v
                }
                Instr::Scalar(slot) => vec![frame.scalar(*slot); n],
                Instr::Const(c) => vec![*c; n],
                Instr::Unary(op, r) => regs[*r].iter().map(|&x| op.apply(x)).collect(),
                Instr::Binary(op, l, r) => regs[*l]
                    .iter()
                    .zip(&regs[*r])
                    .map(|(&x, &y)| op.apply(x, y))
                    .collect(),
                Instr::Select(c, t, e) => regs[*c]
                    .iter()
                    .zip(regs[*t].iter().zip(&regs[*e]))
                    .map(|(&p, (&x, &y))| if p != 0.0 { x } else { y })
                    .collect(),
            };
            regs.push(value);
        }
        out.extend_from_slice(&regs[self.result]);
        Ok(())
    }

    fn write_text(&self, f: &mut dyn io::Write) -> io::Result<()> {
        for (reg, instr) in self.code.iter().enumerate() {
            writeln!(f, "    %{reg} = {instr}")?;
        }
        writeln!(f, "    store %{}", self.result)
    }
}
