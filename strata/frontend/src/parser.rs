#![allow(clippy::upper_case_acronyms)]

//! Parser for stencil definitions.
use crate::ast::{
    self, Bound, Computation, Expr, ExprKind, FieldParam, IntervalDef,
    IntervalRange, ScalarParam, StencilDef, Stmt,
};
use crate::{BinaryOp, DataType, Dims, Literal, UnaryOp};
use pest::error::InputLocation;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_consume::{Error, Parser, match_nodes};
use std::fs;
use std::path::Path;
use strata_utils::{self, FileIdx, GPosIdx, GlobalPositionTable, Id};
use strata_utils::StrataResult;

type ParseResult<T> = Result<T, Error<Rule>>;

/// Data associated with parsing the file.
#[derive(Clone)]
struct UserData {
    /// Index to the current file
    pub file: FileIdx,
}

type Node<'i> = pest_consume::Node<'i, Rule, UserData>;

// include the grammar file so that Cargo knows to rebuild this file on grammar changes
const _GRAMMAR: &str = include_str!("syntax.pest");

// Operator precedence from loosest to tightest.
lazy_static::lazy_static! {
    static ref PRATT: PrattParser<Rule> =
    PrattParser::new()
        .op(Op::infix(Rule::or_op, Assoc::Left))
        .op(Op::infix(Rule::and_op, Assoc::Left))
        .op(Op::prefix(Rule::not_op))
        .op(Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::ne, Assoc::Left)
            | Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left)
            | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::modulo, Assoc::Left))
        .op(Op::prefix(Rule::neg) | Op::prefix(Rule::pos))
        .op(Op::infix(Rule::pow, Assoc::Right));
}

#[derive(Parser)]
#[grammar = "syntax.pest"]
pub struct StrataParser;

impl StrataParser {
    /// Parse a file containing stencil definitions.
    pub fn parse_file(path: &Path) -> StrataResult<ast::Namespace> {
        let content = &fs::read(path).map_err(|err| {
            strata_utils::Error::invalid_file(format!(
                "Failed to read {}: {err}",
                path.to_string_lossy(),
            ))
        })?;
        let string_content = std::str::from_utf8(content)?;
        Self::parse_str(&path.to_string_lossy(), string_content)
    }

    /// Parse `source`. `name` is used to report positions in errors.
    pub fn parse_str(name: &str, source: &str) -> StrataResult<ast::Namespace> {
        let time = std::time::Instant::now();
        // Keep a copy of the source so that errors can point into it.
        let file =
            GlobalPositionTable::add_file(name.to_string(), source.to_string());
        let user_data = UserData { file };
        let inputs =
            StrataParser::parse_with_userdata(Rule::file, source, user_data)
                .map_err(|e| Self::convert_error(file, e))?;
        let input = inputs
            .single()
            .map_err(|e| Self::convert_error(file, e))?;
        let out =
            StrataParser::file(input).map_err(|e| Self::convert_error(file, e))?;
        log::info!(
            "Parsed `{}` ({} stencils) in {}ms",
            name,
            out.stencils.len(),
            time.elapsed().as_millis()
        );
        Ok(out)
    }

    /// Turn a pest error into a grammar error that points into the source.
    fn convert_error(file: FileIdx, err: Error<Rule>) -> strata_utils::Error {
        let (start, end) = match err.location {
            InputLocation::Pos(p) => (p, p),
            InputLocation::Span(span) => span,
        };
        let pos = GlobalPositionTable::add_pos(file, start, end);
        strata_utils::Error::grammar(err.variant.message()).with_pos(&pos)
    }

    fn get_span(node: &Node) -> GPosIdx {
        let ud = node.user_data();
        let sp = node.as_span();
        GlobalPositionTable::add_pos(ud.file, sp.start(), sp.end())
    }

    fn pair_span(ud: &UserData, pair: &Pair<Rule>) -> GPosIdx {
        let sp = pair.as_span();
        GlobalPositionTable::add_pos(ud.file, sp.start(), sp.end())
    }

    #[allow(clippy::result_large_err)]
    fn arith_helper(ud: UserData, pairs: Pairs<Rule>) -> ParseResult<Expr> {
        PRATT
            .map_primary(|primary| {
                let node = Node::new_with_user_data(primary, ud.clone());
                match node.as_rule() {
                    Rule::float => {
                        let span = Self::get_span(&node);
                        Self::float(node)
                            .map(|l| Expr::new(ExprKind::Lit(l), span))
                    }
                    Rule::int => {
                        let span = Self::get_span(&node);
                        Self::int(node)
                            .map(|l| Expr::new(ExprKind::Lit(l), span))
                    }
                    Rule::true_lit | Rule::false_lit => {
                        let span = Self::get_span(&node);
                        let lit = Literal::Bool(node.as_rule() == Rule::true_lit);
                        Ok(Expr::new(ExprKind::Lit(lit), span))
                    }
                    Rule::identifier => {
                        let span = Self::get_span(&node);
                        Self::identifier(node)
                            .map(|id| Expr::new(ExprKind::Name(id), span))
                    }
                    Rule::call => Self::call(node),
                    Rule::access => Self::access(node),
                    Rule::expr => Self::expr(node),
                    x => unreachable!("Unexpected rule {:?} for arith", x),
                }
            })
            .map_prefix(|op, arg| {
                let span = Self::pair_span(&ud, &op);
                let op = match op.as_rule() {
                    Rule::neg => UnaryOp::Neg,
                    Rule::pos => UnaryOp::Pos,
                    Rule::not_op => UnaryOp::Not,
                    x => unreachable!("Unexpected prefix operator {:?}", x),
                };
                Ok(Expr::new(
                    ExprKind::Unary {
                        op,
                        arg: Box::new(arg?),
                    },
                    span,
                ))
            })
            .map_infix(|lhs, op, rhs| {
                let span = Self::pair_span(&ud, &op);
                let op = match op.as_rule() {
                    Rule::add => BinaryOp::Add,
                    Rule::sub => BinaryOp::Sub,
                    Rule::mul => BinaryOp::Mul,
                    Rule::div => BinaryOp::Div,
                    Rule::modulo => BinaryOp::Mod,
                    Rule::pow => BinaryOp::Pow,
                    Rule::eq => BinaryOp::Eq,
                    Rule::ne => BinaryOp::Ne,
                    Rule::lt => BinaryOp::Lt,
                    Rule::le => BinaryOp::Le,
                    Rule::gt => BinaryOp::Gt,
                    Rule::ge => BinaryOp::Ge,
                    Rule::and_op => BinaryOp::And,
                    Rule::or_op => BinaryOp::Or,
                    x => unreachable!("Unexpected infix operator {:?}", x),
                };
                Ok(Expr::new(
                    ExprKind::Binary {
                        op,
                        lhs: Box::new(lhs?),
                        rhs: Box::new(rhs?),
                    },
                    span,
                ))
            })
            .parse(pairs)
    }
}

#[pest_consume::parser]
impl StrataParser {
    fn EOI(_input: Node) -> ParseResult<()> {
        Ok(())
    }

    fn wildcard(_input: Node) -> ParseResult<()> {
        Ok(())
    }

    fn none_kw(_input: Node) -> ParseResult<()> {
        Ok(())
    }

    fn kw_star(_input: Node) -> ParseResult<()> {
        Ok(())
    }

    fn dims_ijk(_input: Node) -> ParseResult<()> {
        Ok(())
    }

    fn dims_zero(_input: Node) -> ParseResult<()> {
        Ok(())
    }

    // ================ Literals =====================
    fn identifier(input: Node) -> ParseResult<Id> {
        Ok(Id::new(input.as_str()))
    }

    fn dtype(input: Node) -> ParseResult<DataType> {
        input.as_str().parse().map_err(|e: String| input.error(e))
    }

    fn float(input: Node) -> ParseResult<Literal> {
        input
            .as_str()
            .parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| input.error("Expected floating point number"))
    }

    fn int(input: Node) -> ParseResult<Literal> {
        input
            .as_str()
            .parse::<i64>()
            .map(Literal::Int)
            .map_err(|_| input.error("Integer literal out of range"))
    }

    fn signed_int(input: Node) -> ParseResult<i64> {
        input
            .as_str()
            .parse::<i64>()
            .map_err(|_| input.error("Integer literal out of range"))
    }

    fn offset(input: Node) -> ParseResult<[i64; 3]> {
        Ok(match_nodes!(
            input.into_children();
            [signed_int(i), signed_int(j), signed_int(k)] => [i, j, k],
        ))
    }

    // ================ Expressions =====================
    fn call(input: Node) -> ParseResult<Expr> {
        let span = Self::get_span(&input);
        let (func, mut args) = match_nodes!(
            input.clone().into_children();
            [identifier(func), expr(args)..] => (func, args.collect::<Vec<_>>()),
        );
        let kind = match args.len() {
            1 => {
                let op = UnaryOp::builtin(func.as_str()).ok_or_else(|| {
                    input.error(format!(
                        "Unknown function `{func}' with one argument"
                    ))
                })?;
                ExprKind::Unary {
                    op,
                    arg: Box::new(args.remove(0)),
                }
            }
            2 => {
                let op = BinaryOp::builtin(func.as_str()).ok_or_else(|| {
                    input.error(format!(
                        "Unknown function `{func}' with two arguments"
                    ))
                })?;
                let rhs = args.remove(1);
                let lhs = args.remove(0);
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }
            }
            n => {
                return Err(input.error(format!(
                    "Function `{func}' called with {n} arguments"
                )));
            }
        };
        Ok(Expr::new(kind, span))
    }

    fn access(input: Node) -> ParseResult<Expr> {
        let span = Self::get_span(&input);
        Ok(match_nodes!(
            input.into_children();
            [identifier(name), offset(offset)] => {
                Expr::new(ExprKind::Access { name, offset }, span)
            }
        ))
    }

    fn arith(input: Node) -> ParseResult<Expr> {
        let ud = input.user_data().clone();
        Self::arith_helper(ud, input.into_pair().into_inner())
    }

    fn expr(input: Node) -> ParseResult<Expr> {
        let span = Self::get_span(&input);
        Ok(match_nodes!(
            input.into_children();
            [arith(e)] => e,
            [arith(then), arith(cond), expr(els)] => Expr::new(
                ExprKind::Ternary {
                    cond: Box::new(cond),
                    then: Box::new(then),
                    els: Box::new(els),
                },
                span,
            ),
        ))
    }

    // ================ Statements =====================
    fn assign(input: Node) -> ParseResult<Stmt> {
        let span = Self::get_span(&input);
        Ok(match_nodes!(
            input.into_children();
            [identifier(target), expr(value)] => Stmt::Assign {
                target, offset: None, value, span
            },
            [identifier(target), offset(offset), expr(value)] => Stmt::Assign {
                target, offset: Some(offset), value, span
            },
        ))
    }

    fn if_stmt(input: Node) -> ParseResult<Stmt> {
        let span = Self::get_span(&input);
        Ok(match_nodes!(
            input.into_children();
            [expr(cond), block(then)] => Stmt::If {
                cond, then, els: vec![], span
            },
            [expr(cond), block(then), block(els)] => Stmt::If {
                cond, then, els, span
            },
            [expr(cond), block(then), if_stmt(els)] => Stmt::If {
                cond, then, els: vec![els], span
            },
        ))
    }

    fn block(input: Node) -> ParseResult<Vec<Stmt>> {
        input
            .into_children()
            .map(|node| match node.as_rule() {
                Rule::assign => Self::assign(node),
                Rule::if_stmt => Self::if_stmt(node),
                x => unreachable!("Unexpected rule {:?} in block", x),
            })
            .collect()
    }

    // ================ Intervals =====================
    fn bound(input: Node) -> ParseResult<Bound> {
        let span = Self::get_span(&input);
        Ok(match_nodes!(
            input.into_children();
            [signed_int(v)] => Bound::Int(v),
            [none_kw(_)] => Bound::None,
            [identifier(name)] => Bound::External(name, span),
        ))
    }

    fn interval_range(input: Node) -> ParseResult<IntervalRange> {
        Ok(match_nodes!(
            input.into_children();
            [wildcard(_)] => IntervalRange::Full,
            [bound(lo), bound(hi)] => IntervalRange::Bounds(lo, hi),
        ))
    }

    fn interval_def(input: Node) -> ParseResult<IntervalDef> {
        let span = Self::get_span(&input);
        Ok(match_nodes!(
            input.into_children();
            [interval_range(range), block(body)] => IntervalDef { range, body, span },
        ))
    }

    fn computation(input: Node) -> ParseResult<Computation> {
        let span = Self::get_span(&input);
        Ok(match_nodes!(
            input.into_children();
            [identifier(policy), interval_def(intervals)..] => Computation {
                policy,
                intervals: intervals.collect(),
                span,
            },
        ))
    }

    fn computations(input: Node) -> ParseResult<Vec<Computation>> {
        Ok(match_nodes!(
            input.into_children();
            [computation(comps)..] => comps.collect(),
        ))
    }

    // ================ Signatures =====================
    fn field_param(input: Node) -> ParseResult<FieldParam> {
        let span = Self::get_span(&input);
        let (name, dtype, dims) = match_nodes!(
            input.into_children();
            [identifier(name), dtype(dtype)] => (name, dtype, Dims::IJK),
            [identifier(name), dtype(dtype), dims_ijk(_)] => (name, dtype, Dims::IJK),
            [identifier(name), dtype(dtype), dims_zero(_)] => (name, dtype, Dims::Zero),
        );
        Ok(FieldParam {
            name,
            dtype,
            dims,
            span,
        })
    }

    fn scalar_param(input: Node) -> ParseResult<ScalarParam> {
        let span = Self::get_span(&input);
        Ok(match_nodes!(
            input.into_children();
            [identifier(name), dtype(dtype)] => ScalarParam { name, dtype, span },
        ))
    }

    fn params(input: Node) -> ParseResult<(Vec<FieldParam>, Vec<ScalarParam>)> {
        let mut fields = Vec::new();
        let mut scalars = Vec::new();
        let mut keyword_only = false;
        for node in input.into_children() {
            match node.as_rule() {
                Rule::kw_star if keyword_only => {
                    return Err(node.error("Duplicate `*' in signature"));
                }
                Rule::kw_star => keyword_only = true,
                Rule::field_param if keyword_only => {
                    return Err(node.error(
                        "Fields must be declared before the `*' marker",
                    ));
                }
                Rule::field_param => fields.push(Self::field_param(node)?),
                Rule::scalar_param if !keyword_only => {
                    return Err(node.error(
                        "Scalar parameters are keyword-only and must follow `*'",
                    ));
                }
                Rule::scalar_param => scalars.push(Self::scalar_param(node)?),
                x => unreachable!("Unexpected rule {:?} in signature", x),
            }
        }
        Ok((fields, scalars))
    }

    fn externals(input: Node) -> ParseResult<Vec<(Id, GPosIdx)>> {
        input
            .into_children()
            .map(|node| {
                let span = Self::get_span(&node);
                Self::identifier(node).map(|id| (id, span))
            })
            .collect()
    }

    fn stencil_def(input: Node) -> ParseResult<StencilDef> {
        let span = Self::get_span(&input);
        Ok(match_nodes!(
            input.into_children();
            [identifier(name), params((fields, scalars)), externals(externals), computations(computations)] => {
                StencilDef {
                    name,
                    fields,
                    scalars,
                    externals,
                    computations,
                    span,
                }
            }
        ))
    }

    fn file(input: Node) -> ParseResult<ast::Namespace> {
        Ok(match_nodes!(
            input.into_children();
            [stencil_def(stencils).., EOI(_)] => ast::Namespace {
                stencils: stencils.collect(),
            },
        ))
    }
}
