//! Implements a formatter for the in-memory representation of a stencil.
//! Statements are annotated with their compute extents once extent analysis
//! has run.
use crate::{self as ir, Context, Expr, StmtRef};
use itertools::Itertools;
use std::io;
use strata_frontend::{Literal, UnaryOp};

/// Printer for the IR.
pub struct Printer;

const TERNARY: u8 = 0;
const NOT: u8 = 3;
const SIGN: u8 = 7;
const ATOM: u8 = 10;

impl Printer {
    fn precedence(expr: &Expr) -> u8 {
        match expr {
            Expr::Lit(Literal::Int(v)) if *v < 0 => SIGN,
            Expr::Lit(Literal::Float(v)) if v.is_sign_negative() => SIGN,
            Expr::Lit(_) | Expr::Field { .. } | Expr::Scalar(_) => ATOM,
            Expr::Unary {
                op: UnaryOp::Not, ..
            } => NOT,
            Expr::Unary { op, .. } if op.function_name().is_none() => SIGN,
            Expr::Unary { .. } => ATOM,
            Expr::Binary { op, .. } if op.function_name().is_some() => ATOM,
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Cond { .. } => TERNARY,
        }
    }

    fn format_expr_prec(expr: &Expr, min: u8) -> String {
        let out = match expr {
            Expr::Lit(lit) => lit.to_string(),
            Expr::Field { name, offset } if offset.is_zero() => name.to_string(),
            Expr::Field { name, offset } => format!("{name}{offset}"),
            Expr::Scalar(name) => name.to_string(),
            Expr::Unary { op, arg } => match op.function_name() {
                Some(func) => format!("{func}({})", Self::format_expr(arg)),
                None if *op == UnaryOp::Not => {
                    format!("not {}", Self::format_expr_prec(arg, NOT))
                }
                None => format!("{op}{}", Self::format_expr_prec(arg, SIGN + 1)),
            },
            Expr::Binary { op, lhs, rhs } => match op.function_name() {
                Some(func) => format!(
                    "{func}({}, {})",
                    Self::format_expr(lhs),
                    Self::format_expr(rhs)
                ),
                None => {
                    let p = op.precedence();
                    let (l, r) = if *op == strata_frontend::BinaryOp::Pow {
                        (p + 1, p)
                    } else {
                        (p, p + 1)
                    };
                    format!(
                        "{} {op} {}",
                        Self::format_expr_prec(lhs, l),
                        Self::format_expr_prec(rhs, r)
                    )
                }
            },
            Expr::Cond { cond, then, els } => format!(
                "{} if {} else {}",
                Self::format_expr_prec(then, TERNARY + 1),
                Self::format_expr_prec(cond, TERNARY + 1),
                Self::format_expr_prec(els, TERNARY)
            ),
        };
        if Self::precedence(expr) < min {
            format!("({out})")
        } else {
            out
        }
    }

    /// Format an expression with the minimal set of parentheses.
    pub fn format_expr(expr: &Expr) -> String {
        Self::format_expr_prec(expr, TERNARY)
    }

    /// Format the declarations of a stencil.
    fn format_decls(ctx: &Context) -> Vec<String> {
        let stencil = &ctx.stencil;
        let mut decls = stencil
            .fields
            .values()
            .map(|f| {
                let halo = ctx
                    .extents
                    .as_ref()
                    .and_then(|ext| ext.extent(&f.name))
                    .map(|e| format!("  # {e}"))
                    .unwrap_or_default();
                format!(
                    "{} field {}: {}[{}]{halo}",
                    f.kind, f.name, f.dtype, f.dims
                )
            })
            .collect_vec();
        decls.extend(
            stencil
                .scalars
                .values()
                .map(|s| format!("scalar {}: {}", s.name, s.dtype)),
        );
        decls.extend(
            ctx.externals
                .iter()
                .map(|(name, value)| format!("external {name} = {value}")),
        );
        decls
    }

    /// Prints out the program context.
    pub fn write_context<F: io::Write>(
        ctx: &Context,
        f: &mut F,
    ) -> io::Result<()> {
        let stencil = &ctx.stencil;
        writeln!(f, "stencil {} {{", stencil.name)?;
        for decl in Self::format_decls(ctx) {
            writeln!(f, "  {decl}")?;
        }
        if ctx.min_k_size > 0 {
            writeln!(f, "  # requires at least {} vertical levels", ctx.min_k_size)?;
        }
        for (b, block) in stencil.blocks.iter().enumerate() {
            Self::write_block(ctx, b, block, f)?;
        }
        writeln!(f, "}}")
    }

    fn write_block<F: io::Write>(
        ctx: &Context,
        b: usize,
        block: &ir::ComputationBlock,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(f, "  with computation({}) {{", block.policy)?;
        for (i, iv) in block.intervals.iter().enumerate() {
            writeln!(f, "    interval({}) {{", iv.interval)?;
            for (s, stmt) in iv.stmts.iter().enumerate() {
                let stmt_ref = StmtRef {
                    block: b,
                    interval: i,
                    stmt: s,
                };
                let note = match &ctx.extents {
                    Some(ext) => match ext.compute_extent(stmt_ref) {
                        Some(e) => format!("  # {e}"),
                        None => "  # dead".to_string(),
                    },
                    None => String::new(),
                };
                writeln!(
                    f,
                    "      {} = {}{note}",
                    stmt.target,
                    Self::format_expr(&stmt.value)
                )?;
            }
            writeln!(f, "    }}")?;
        }
        writeln!(f, "  }}")
    }

    /// The text [Printer::write_context] produces.
    pub fn context_to_string(ctx: &Context) -> String {
        let mut buf = Vec::new();
        // Writing into a vector cannot fail.
        let _ = Self::write_context(ctx, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Offset;
    use strata_frontend::BinaryOp;
    use strata_utils::Id;

    #[test]
    fn negative_literals_are_parenthesized() {
        let e = Expr::Binary {
            op: BinaryOp::Pow,
            lhs: Box::new(Expr::field(Id::new("a"), Offset::new(0, 0, -1))),
            rhs: Box::new(Expr::Lit(Literal::Float(-0.5))),
        };
        assert_eq!(Printer::format_expr(&e), "a[0, 0, -1] ** (-0.5)");
        let neg = Expr::Unary {
            op: UnaryOp::Neg,
            arg: Box::new(Expr::Lit(Literal::Int(-1))),
        };
        assert_eq!(Printer::format_expr(&neg), "-(-1)");
    }
}
