//! Prints stencil definitions back as source text.
//!
//! The output is canonical: comments, whitespace and redundant parentheses
//! are dropped, so two definitions that differ only in formatting print the
//! same way. The text parses back to the same definition.
use crate::ast::{
    Bound, Expr, ExprKind, IntervalRange, StencilDef, Stmt,
};
use crate::{BinaryOp, Dims, UnaryOp};
use itertools::Itertools;
use std::io;

/// Printer for the AST.
pub struct Printer;

/// Binding strength of the ternary operator.
const TERNARY: u8 = 0;
/// Binding strength of `not`.
const NOT: u8 = 3;
/// Binding strength of unary `-` and `+`.
const SIGN: u8 = 7;
/// Atoms never need parentheses.
const ATOM: u8 = 10;

impl Printer {
    fn precedence(expr: &Expr) -> u8 {
        match &expr.kind {
            ExprKind::Lit(_) | ExprKind::Name(_) | ExprKind::Access { .. } => {
                ATOM
            }
            ExprKind::Unary { op: UnaryOp::Not, .. } => NOT,
            ExprKind::Unary { op, .. } if op.function_name().is_none() => SIGN,
            ExprKind::Unary { .. } => ATOM,
            ExprKind::Binary { op, .. } if op.function_name().is_some() => {
                ATOM
            }
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Ternary { .. } => TERNARY,
        }
    }

    fn format_offset(offset: &[i64; 3]) -> String {
        format!("[{}]", offset.iter().join(", "))
    }

    /// Format `expr`, adding parentheses if it binds looser than `min`.
    fn format_expr_prec(expr: &Expr, min: u8) -> String {
        let out = match &expr.kind {
            ExprKind::Lit(lit) => lit.to_string(),
            ExprKind::Name(name) => name.to_string(),
            ExprKind::Access { name, offset } => {
                format!("{name}{}", Self::format_offset(offset))
            }
            ExprKind::Unary { op, arg } => match op.function_name() {
                Some(func) => format!("{func}({})", Self::format_expr(arg)),
                None if *op == UnaryOp::Not => {
                    format!("not {}", Self::format_expr_prec(arg, NOT))
                }
                None => format!("{op}{}", Self::format_expr_prec(arg, SIGN)),
            },
            ExprKind::Binary { op, lhs, rhs } => match op.function_name() {
                Some(func) => format!(
                    "{func}({}, {})",
                    Self::format_expr(lhs),
                    Self::format_expr(rhs)
                ),
                None => {
                    let p = op.precedence();
                    // `**` is right associative, everything else left.
                    let (l, r) =
                        if *op == BinaryOp::Pow { (p + 1, p) } else { (p, p + 1) };
                    format!(
                        "{} {op} {}",
                        Self::format_expr_prec(lhs, l),
                        Self::format_expr_prec(rhs, r)
                    )
                }
            },
            ExprKind::Ternary { cond, then, els } => format!(
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

    fn format_bound(bound: &Bound) -> String {
        match bound {
            Bound::Int(v) => v.to_string(),
            Bound::None => "None".to_string(),
            Bound::External(name, _) => name.to_string(),
        }
    }

    fn format_range(range: &IntervalRange) -> String {
        match range {
            IntervalRange::Full => "...".to_string(),
            IntervalRange::Bounds(lo, hi) => format!(
                "{}, {}",
                Self::format_bound(lo),
                Self::format_bound(hi)
            ),
        }
    }

    fn write_stmts<F: io::Write>(
        stmts: &[Stmt],
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        for stmt in stmts {
            match stmt {
                Stmt::Assign {
                    target,
                    offset,
                    value,
                    ..
                } => {
                    let offset =
                        offset.as_ref().map(Self::format_offset).unwrap_or_default();
                    writeln!(
                        f,
                        "{}{target}{offset} = {}",
                        " ".repeat(indent),
                        Self::format_expr(value)
                    )?;
                }
                Stmt::If {
                    cond, then, els, ..
                } => {
                    writeln!(
                        f,
                        "{}if {} {{",
                        " ".repeat(indent),
                        Self::format_expr(cond)
                    )?;
                    Self::write_stmts(then, indent + 4, f)?;
                    if els.is_empty() {
                        writeln!(f, "{}}}", " ".repeat(indent))?;
                    } else {
                        writeln!(f, "{}}} else {{", " ".repeat(indent))?;
                        Self::write_stmts(els, indent + 4, f)?;
                        writeln!(f, "{}}}", " ".repeat(indent))?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Write a stencil definition in canonical form.
    pub fn write_stencil<F: io::Write>(
        def: &StencilDef,
        f: &mut F,
    ) -> io::Result<()> {
        let mut params = def
            .fields
            .iter()
            .map(|p| match p.dims {
                Dims::IJK => format!("{}: Field[{}]", p.name, p.dtype),
                Dims::Zero => format!("{}: Field[{}, ()]", p.name, p.dtype),
            })
            .collect_vec();
        if !def.scalars.is_empty() {
            params.push("*".to_string());
            params.extend(
                def.scalars
                    .iter()
                    .map(|s| format!("{}: {}", s.name, s.dtype)),
            );
        }
        writeln!(f, "stencil {}({}) {{", def.name, params.join(", "))?;
        if !def.externals.is_empty() {
            writeln!(
                f,
                "    externals {}",
                def.externals.iter().map(|(name, _)| name).join(", ")
            )?;
        }
        for comp in &def.computations {
            writeln!(f, "    with computation({}) {{", comp.policy)?;
            for interval in &comp.intervals {
                writeln!(
                    f,
                    "        interval({}) {{",
                    Self::format_range(&interval.range)
                )?;
                Self::write_stmts(&interval.body, 12, f)?;
                writeln!(f, "        }}")?;
            }
            writeln!(f, "    }}")?;
        }
        writeln!(f, "}}")
    }

    /// Canonical text of a stencil definition.
    pub fn stencil_to_string(def: &StencilDef) -> String {
        let mut buf = Vec::new();
        // Writing into a vector cannot fail.
        let _ = Self::write_stencil(def, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StrataParser;

    fn canonical(src: &str) -> String {
        let ns = StrataParser::parse_str("printer", src)
            .unwrap_or_else(|e| panic!("{e:?}"));
        Printer::stencil_to_string(&ns.stencils[0])
    }

    #[test]
    fn formatting_does_not_change_canonical_text() {
        let a = canonical(
            "stencil s(a: Field[f64], b: Field[f64]) { with computation(PARALLEL), interval(...) { b = (a + 1) * 2 } }",
        );
        let b = canonical(
            r#"
            # the same stencil, spelled differently
            stencil s(a: Field[f64, IJK], b: Field[f64],) {
                with computation(PARALLEL) {
                    interval(...) {
                        b[0, 0, 0] = ((a + 1)) * 2;
                    }
                }
            }"#,
        );
        assert_eq!(a.replace("b[0, 0, 0]", "b"), b.replace("b[0, 0, 0]", "b"));
    }

    #[test]
    fn canonical_text_parses_back() {
        let src = r#"
            stencil s(a: Field[f64], b: Field[f64], c: Field[f64, ()], *, w: f64) {
                externals K
                with computation(FORWARD), interval(K, -1) {
                    b = a - (a - 1) - 2 ** -a ** 2 if not a > c else -(a + w)
                    if a > 0 { b = min(a, 1.5) } else { b = abs(a) }
                }
            }"#;
        let once = canonical(src);
        assert_eq!(canonical(&once), once);
        assert!(once.contains("a - (a - 1)"));
        assert!(once.contains("-(a + w)"));
    }
}
