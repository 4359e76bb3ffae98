//! Builds the IR of a stencil from its AST.
use crate::{
    AxisBound, ComputationBlock, Context, Expr, Externals, FieldDecl,
    FieldKind, Interval, IntervalBlock, Offset, ScalarDecl, Stencil, Stmt,
    TypeSignature,
};
use itertools::Itertools;
use linked_hash_map::LinkedHashMap;
use std::collections::{HashMap, HashSet};
use strata_frontend::ast::{self, Bound, ExprKind, IntervalRange};
use strata_frontend::{BinaryOp, DataType, Dims, Literal, Policy, UnaryOp};
use strata_utils::{Error, GPosIdx, Id, NameGenerator, StrataResult};

/// Prefix of the temporaries that hold `if` conditions.
const COND_PREFIX: &str = "__cond";

/// Check that every parameter and external is bound exactly once.
fn check_names(def: &ast::StencilDef) -> StrataResult<()> {
    let mut bound: HashMap<Id, &str> = HashMap::new();
    let names = def
        .fields
        .iter()
        .map(|f| (f.name, f.span, "field"))
        .chain(def.scalars.iter().map(|s| (s.name, s.span, "scalar parameter")))
        .chain(def.externals.iter().map(|(n, span)| (*n, *span, "external")));
    for (name, span, kind) in names {
        if let Some(prev) = bound.insert(name, kind) {
            return Err(Error::already_bound(name, prev).with_pos(&span));
        }
    }
    Ok(())
}

/// Look up the values of the externals `def` declares.
fn resolve_externals(
    def: &ast::StencilDef,
    externals: &Externals,
) -> StrataResult<Externals> {
    def.externals
        .iter()
        .map(|(name, span)| {
            externals
                .get(name)
                .map(|v| (*name, *v))
                .ok_or_else(|| Error::unresolved_external(*name).with_pos(span))
        })
        .collect()
}

/// Collect every name assigned in `body`.
fn assigned_names(body: &[ast::Stmt], names: &mut HashSet<Id>) {
    for stmt in body {
        match stmt {
            ast::Stmt::Assign { target, .. } => {
                names.insert(*target);
            }
            ast::Stmt::If { then, els, .. } => {
                assigned_names(then, names);
                assigned_names(els, names);
            }
        }
    }
}

/// Type of a folded literal.
fn folded(value: f64, boolean: bool, integral: bool) -> Literal {
    if boolean {
        Literal::Bool(value != 0.0)
    } else if integral
        && value.fract() == 0.0
        && value.abs() < i64::MAX as f64
    {
        Literal::Int(value as i64)
    } else {
        Literal::Float(value)
    }
}

fn fold_unary(op: UnaryOp, arg: Expr) -> Expr {
    match arg {
        Expr::Lit(lit) => {
            let integral = matches!(lit, Literal::Int(_))
                && matches!(op, UnaryOp::Neg | UnaryOp::Pos | UnaryOp::Abs);
            Expr::Lit(folded(
                op.apply(lit.as_f64()),
                op == UnaryOp::Not,
                integral,
            ))
        }
        arg => Expr::Unary {
            op,
            arg: Box::new(arg),
        },
    }
}

fn fold_binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    match (lhs, rhs) {
        (Expr::Lit(l), Expr::Lit(r)) => {
            let boolean = matches!(
                op,
                BinaryOp::Eq
                    | BinaryOp::Ne
                    | BinaryOp::Lt
                    | BinaryOp::Le
                    | BinaryOp::Gt
                    | BinaryOp::Ge
                    | BinaryOp::And
                    | BinaryOp::Or
            );
            let integral = matches!((l, r), (Literal::Int(_), Literal::Int(_)))
                && matches!(
                    op,
                    BinaryOp::Add
                        | BinaryOp::Sub
                        | BinaryOp::Mul
                        | BinaryOp::Mod
                        | BinaryOp::Min
                        | BinaryOp::Max
                );
            Expr::Lit(folded(
                op.apply(l.as_f64(), r.as_f64()),
                boolean,
                integral,
            ))
        }
        (lhs, rhs) => Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    }
}

fn fold_cond(cond: Expr, then: Expr, els: Expr) -> Expr {
    match cond {
        Expr::Lit(lit) if lit.as_f64() != 0.0 => then,
        Expr::Lit(_) => els,
        cond => Expr::Cond {
            cond: Box::new(cond),
            then: Box::new(then),
            els: Box::new(els),
        },
    }
}

/// Names visible while building the body of a stencil.
struct Scope {
    name: Id,
    fields: LinkedHashMap<Id, FieldDecl>,
    scalars: LinkedHashMap<Id, ScalarDecl>,
    externals: Externals,
    /// Temporaries assigned so far, following source order.
    defined: HashSet<Id>,
    /// Targets of every assignment lowered so far, in either branch of an
    /// `if`.
    assigned: HashSet<Id>,
    namegen: NameGenerator,
}

impl Scope {
    fn new(
        def: &ast::StencilDef,
        externals: Externals,
        signature: &TypeSignature,
    ) -> StrataResult<Self> {
        for (name, _) in signature.iter() {
            let known = def.fields.iter().any(|f| f.name == *name)
                || def.scalars.iter().any(|s| s.name == *name);
            if !known {
                return Err(Error::grammar(format!(
                    "type signature names `{name}' which is not a parameter of `{}'",
                    def.name
                ))
                .with_pos(def));
            }
        }

        let fields = def
            .fields
            .iter()
            .map(|f| {
                let decl = FieldDecl {
                    name: f.name,
                    dtype: signature.get(&f.name).unwrap_or(f.dtype),
                    dims: f.dims,
                    kind: FieldKind::Input,
                    span: f.span,
                };
                (f.name, decl)
            })
            .collect();
        let scalars = def
            .scalars
            .iter()
            .map(|s| {
                let decl = ScalarDecl {
                    name: s.name,
                    dtype: signature.get(&s.name).unwrap_or(s.dtype),
                };
                (s.name, decl)
            })
            .collect();

        let mut taken: HashSet<Id> = def
            .fields
            .iter()
            .map(|f| f.name)
            .chain(def.scalars.iter().map(|s| s.name))
            .chain(def.externals.iter().map(|(n, _)| *n))
            .collect();
        for comp in &def.computations {
            for interval in &comp.intervals {
                assigned_names(&interval.body, &mut taken);
            }
        }

        Ok(Self {
            name: def.name,
            fields,
            scalars,
            externals,
            defined: HashSet::new(),
            assigned: HashSet::new(),
            namegen: NameGenerator::with_prev_defined_names(taken),
        })
    }

    fn computation(
        &mut self,
        comp: &ast::Computation,
    ) -> StrataResult<ComputationBlock> {
        let policy: Policy = comp
            .policy
            .as_str()
            .parse()
            .map_err(|e: String| Error::grammar(e).with_pos(comp))?;
        let intervals = comp
            .intervals
            .iter()
            .map(|iv| {
                Ok(IntervalBlock {
                    interval: self.interval(&iv.range)?,
                    stmts: self.body(&iv.body)?,
                    span: iv.span,
                })
            })
            .collect::<StrataResult<_>>()?;
        Ok(ComputationBlock {
            policy,
            intervals,
            span: comp.span,
        })
    }

    fn interval(&self, range: &IntervalRange) -> StrataResult<Interval> {
        match range {
            IntervalRange::Full => Ok(Interval::full()),
            IntervalRange::Bounds(lo, hi) => {
                Ok(Interval::new(self.bound(lo)?, self.bound(hi)?))
            }
        }
    }

    fn bound(&self, bound: &Bound) -> StrataResult<AxisBound> {
        match bound {
            Bound::Int(v) => Ok(AxisBound::from_source(*v)),
            Bound::None => Ok(AxisBound::end(0)),
            Bound::External(name, span) => match self.externals.get(name) {
                Some(Literal::Int(v)) => Ok(AxisBound::from_source(*v)),
                Some(lit) => Err(Error::grammar(format!(
                    "interval bound `{name}' must be an integer, found {lit}"
                ))
                .with_pos(span)),
                None => Err(Error::undefined(*name, "external").with_pos(span)),
            },
        }
    }

    fn body(&mut self, body: &[ast::Stmt]) -> StrataResult<Vec<Stmt>> {
        let mut out = Vec::with_capacity(body.len());
        for stmt in body {
            self.stmt(stmt, &[], &mut out)?;
        }
        Ok(out)
    }

    /// Lower `stmt` into `out`. `guards` are the condition temporaries of the
    /// enclosing `if` statements together with the branch taken.
    fn stmt(
        &mut self,
        stmt: &ast::Stmt,
        guards: &[(Id, bool)],
        out: &mut Vec<Stmt>,
    ) -> StrataResult<()> {
        match stmt {
            ast::Stmt::Assign {
                target,
                offset,
                value,
                span,
            } => {
                if offset.is_some_and(|o| o != [0, 0, 0]) {
                    return Err(Error::grammar(format!(
                        "assignment to `{target}' must be at offset [0, 0, 0]"
                    ))
                    .with_pos(span));
                }
                let value = self.expr(value)?;
                let fresh = self
                    .fields
                    .get(target)
                    .is_none_or(|decl| decl.kind == FieldKind::Temporary)
                    && self.assigned.insert(*target);
                self.define(*target, *span)?;
                // A temporary holds nothing yet where it is first assigned,
                // so the branch not taken writes zero instead of keeping it.
                let current = if fresh {
                    Expr::Lit(Literal::Float(0.0))
                } else {
                    Expr::field(*target, Offset::zero())
                };
                out.push(Stmt {
                    target: *target,
                    value: Self::guarded(value, current, guards),
                    span: *span,
                });
            }
            ast::Stmt::If {
                cond,
                then,
                els,
                span,
            } => {
                let cond = self.expr(cond)?;
                let cond_name = self.namegen.gen_name(COND_PREFIX);
                self.fields.insert(
                    cond_name,
                    FieldDecl {
                        name: cond_name,
                        dtype: DataType::Bool,
                        dims: Dims::IJK,
                        kind: FieldKind::Temporary,
                        span: *span,
                    },
                );
                self.defined.insert(cond_name);
                out.push(Stmt {
                    target: cond_name,
                    value: cond,
                    span: *span,
                });

                let before = self.defined.clone();
                let branch = |taken: bool| {
                    let mut g = guards.to_vec();
                    g.push((cond_name, taken));
                    g
                };
                let then_guards = branch(true);
                for s in then {
                    self.stmt(s, &then_guards, out)?;
                }
                let after_then =
                    std::mem::replace(&mut self.defined, before.clone());
                let else_guards = branch(false);
                for s in els {
                    self.stmt(s, &else_guards, out)?;
                }
                let after_else = std::mem::take(&mut self.defined);

                if let Some(name) = after_then
                    .symmetric_difference(&after_else)
                    .filter(|n| !before.contains(*n))
                    .sorted()
                    .next()
                {
                    return Err(Error::grammar(format!(
                        "temporary `{name}' is first assigned in only one branch of `if'"
                    ))
                    .with_pos(span));
                }
                self.defined = after_then;
            }
        }
        Ok(())
    }

    /// Make an assignment of `value` conditional on `guards`. Points where
    /// the guards fail get `current`.
    fn guarded(value: Expr, current: Expr, guards: &[(Id, bool)]) -> Expr {
        match guards {
            [] => value,
            [(cond, taken)] => {
                let cond = Box::new(Expr::field(*cond, Offset::zero()));
                let (then, els) = if *taken {
                    (value, current)
                } else {
                    (current, value)
                };
                Expr::Cond {
                    cond,
                    then: Box::new(then),
                    els: Box::new(els),
                }
            }
            _ => {
                let cond = guards
                    .iter()
                    .map(|(cond, taken)| {
                        let c = Expr::field(*cond, Offset::zero());
                        if *taken {
                            c
                        } else {
                            Expr::Unary {
                                op: UnaryOp::Not,
                                arg: Box::new(c),
                            }
                        }
                    })
                    .reduce(|lhs, rhs| Expr::Binary {
                        op: BinaryOp::And,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    });
                match cond {
                    Some(cond) => Expr::Cond {
                        cond: Box::new(cond),
                        then: Box::new(value),
                        els: Box::new(current),
                    },
                    None => value,
                }
            }
        }
    }

    /// Record an assignment to `name`.
    fn define(&mut self, name: Id, span: GPosIdx) -> StrataResult<()> {
        if self.scalars.contains_key(&name) {
            return Err(Error::grammar(format!(
                "cannot assign to scalar parameter `{name}'"
            ))
            .with_pos(&span));
        }
        if self.externals.get(&name).is_some() {
            return Err(Error::grammar(format!(
                "cannot assign to external `{name}'"
            ))
            .with_pos(&span));
        }
        match self.fields.get_mut(&name) {
            Some(decl) if decl.dims == Dims::Zero => Err(Error::grammar(
                format!("cannot assign to 0-D field `{name}'"),
            )
            .with_pos(&span)),
            Some(decl) => {
                match decl.kind {
                    FieldKind::Input => decl.kind = FieldKind::Output,
                    FieldKind::Output => (),
                    FieldKind::Temporary => {
                        self.defined.insert(name);
                    }
                }
                Ok(())
            }
            None => {
                self.fields.insert(
                    name,
                    FieldDecl {
                        name,
                        dtype: DataType::F64,
                        dims: Dims::IJK,
                        kind: FieldKind::Temporary,
                        span,
                    },
                );
                self.defined.insert(name);
                Ok(())
            }
        }
    }

    /// Resolve a read of `name`.
    fn read(
        &self,
        name: Id,
        offset: Option<[i64; 3]>,
        span: GPosIdx,
    ) -> StrataResult<Expr> {
        if let Some(value) = self.externals.get(&name) {
            return match offset {
                Some(_) => Err(Error::grammar(format!(
                    "external `{name}' cannot be accessed with an offset"
                ))
                .with_pos(&span)),
                None => Ok(Expr::Lit(*value)),
            };
        }
        if self.scalars.contains_key(&name) {
            return match offset {
                Some(_) => Err(Error::grammar(format!(
                    "scalar parameter `{name}' cannot be accessed with an offset"
                ))
                .with_pos(&span)),
                None => Ok(Expr::Scalar(name)),
            };
        }
        let Some(decl) = self.fields.get(&name) else {
            return Err(Error::undefined(name, "field").with_pos(&span));
        };
        let offset = offset.map(Offset::from).unwrap_or_default();
        if decl.kind == FieldKind::Temporary && !self.defined.contains(&name) {
            return Err(Error::grammar(format!(
                "temporary `{name}' is read before it is assigned"
            ))
            .with_pos(&span));
        }
        if decl.dims == Dims::Zero && !offset.is_zero() {
            return Err(Error::grammar(format!(
                "0-D field `{name}' cannot be accessed with an offset"
            ))
            .with_pos(&span));
        }
        Ok(Expr::field(name, offset))
    }

    fn expr(&self, expr: &ast::Expr) -> StrataResult<Expr> {
        Ok(match &expr.kind {
            ExprKind::Lit(lit) => Expr::Lit(*lit),
            ExprKind::Name(name) => self.read(*name, None, expr.span)?,
            ExprKind::Access { name, offset } => {
                self.read(*name, Some(*offset), expr.span)?
            }
            ExprKind::Unary { op, arg } => fold_unary(*op, self.expr(arg)?),
            ExprKind::Binary { op, lhs, rhs } => {
                fold_binary(*op, self.expr(lhs)?, self.expr(rhs)?)
            }
            ExprKind::Ternary { cond, then, els } => fold_cond(
                self.expr(cond)?,
                self.expr(then)?,
                self.expr(els)?,
            ),
        })
    }
}

/// Construct the IR for `def`, substituting `externals` and applying the
/// element type overrides in `signature`.
pub fn ast_to_ir(
    def: &ast::StencilDef,
    externals: &Externals,
    signature: &TypeSignature,
) -> StrataResult<Context> {
    let time = std::time::Instant::now();
    check_names(def)?;
    let resolved = resolve_externals(def, externals)?;
    let mut scope = Scope::new(def, resolved.clone(), signature)?;
    let blocks = def
        .computations
        .iter()
        .map(|comp| scope.computation(comp))
        .collect::<StrataResult<Vec<_>>>()?;

    let stencil = Stencil {
        name: scope.name,
        fields: scope.fields,
        scalars: scope.scalars,
        blocks,
        span: def.span,
    };
    log::info!(
        "Built IR for `{}': {} blocks, {} statements, {} temporaries in {}ms",
        stencil.name,
        stencil.blocks.len(),
        stencil.statements().count(),
        stencil.temporaries().count(),
        time.elapsed().as_millis()
    );
    Ok(Context::new(stencil, resolved, signature.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_frontend::StrataParser;
    use strata_utils::ErrorKind;

    fn build(src: &str, externals: &Externals) -> StrataResult<Context> {
        let ns = StrataParser::parse_str("from_ast", src)?;
        ast_to_ir(&ns.stencils[0], externals, &TypeSignature::new())
    }

    fn grammar_error(src: &str) -> String {
        match build(src, &Externals::new()) {
            Err(e) if matches!(e.kind(), ErrorKind::Grammar(_)) => e.message(),
            Err(e) => panic!("expected grammar error, got {e:?}"),
            Ok(_) => panic!("expected grammar error"),
        }
    }

    #[test]
    fn field_kinds_are_inferred() {
        let ctx = build(
            r#"
            stencil s(a: Field[f64], b: Field[f64], unused: Field[f64]) {
                with computation(PARALLEL), interval(...) {
                    tmp = a + 1
                    b = tmp
                }
            }"#,
            &Externals::new(),
        )
        .unwrap();
        let kinds = ctx
            .stencil
            .fields
            .values()
            .map(|f| (f.name.as_str(), f.kind))
            .collect_vec();
        assert_eq!(
            kinds,
            vec![
                ("a", FieldKind::Input),
                ("b", FieldKind::Output),
                ("unused", FieldKind::Input),
                ("tmp", FieldKind::Temporary),
            ]
        );
    }

    #[test]
    fn externals_fold_like_literals() {
        let with_ext = build(
            r#"
            stencil s(a: Field[f64], b: Field[f64]) {
                externals BET_M, BET_P
                with computation(PARALLEL), interval(...) {
                    b = (BET_M + BET_P) * a - BET_M * 2
                }
            }"#,
            &Externals::new().with("BET_M", 0.5).with("BET_P", 0.5),
        )
        .unwrap();
        let literal = build(
            r#"
            stencil s(a: Field[f64], b: Field[f64]) {
                with computation(PARALLEL), interval(...) {
                    b = 1.0 * a - 1.0
                }
            }"#,
            &Externals::new(),
        )
        .unwrap();
        let value = |ctx: &Context| ctx.stencil.blocks[0].intervals[0].stmts[0].value.clone();
        assert_eq!(value(&with_ext), value(&literal));
    }

    #[test]
    fn missing_external_is_reported() {
        let err = build(
            "stencil s(a: Field[f64]) { externals A\n with computation(PARALLEL), interval(...) { a = A } }",
            &Externals::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ExternalResolution(Id::new("A")));
    }

    #[test]
    fn interval_bounds_are_normalized() {
        let ctx = build(
            r#"
            stencil s(a: Field[f64]) {
                externals TOP
                with computation(BACKWARD) {
                    interval(TOP, None) { a = 1 }
                    interval(0, TOP) { a = 2 }
                }
            }"#,
            &Externals::new().with("TOP", -2i64),
        )
        .unwrap();
        let intervals = &ctx.stencil.blocks[0].intervals;
        assert_eq!(
            intervals[0].interval,
            Interval::new(AxisBound::end(-2), AxisBound::end(0))
        );
        assert_eq!(
            intervals[1].interval,
            Interval::new(AxisBound::start(0), AxisBound::end(-2))
        );
    }

    #[test]
    fn if_is_lowered_to_selects() {
        let ctx = build(
            r#"
            stencil s(a: Field[f64], b: Field[f64]) {
                with computation(PARALLEL), interval(...) {
                    if a > 0 { b = 1 } else { b = 2 }
                }
            }"#,
            &Externals::new(),
        )
        .unwrap();
        let stmts = &ctx.stencil.blocks[0].intervals[0].stmts;
        assert_eq!(stmts.len(), 3);
        let cond = stmts[0].target;
        assert!(cond.as_str().starts_with(COND_PREFIX));
        assert_eq!(ctx.stencil.field(&cond).map(|f| f.dtype), Some(DataType::Bool));
        let b = Expr::field(Id::new("b"), Offset::zero());
        let c = Expr::field(cond, Offset::zero());
        assert_eq!(
            stmts[1].value,
            Expr::Cond {
                cond: Box::new(c.clone()),
                then: Box::new(Expr::Lit(Literal::Int(1))),
                els: Box::new(b.clone()),
            }
        );
        assert_eq!(
            stmts[2].value,
            Expr::Cond {
                cond: Box::new(c),
                then: Box::new(b),
                els: Box::new(Expr::Lit(Literal::Int(2))),
            }
        );
    }

    #[test]
    fn temporaries_need_every_branch() {
        let msg = grammar_error(
            r#"
            stencil s(a: Field[f64], b: Field[f64]) {
                with computation(PARALLEL), interval(...) {
                    if a > 0 { t = 1 }
                    b = t
                }
            }"#,
        );
        assert!(msg.contains("only one branch"), "{msg}");
        // Assigned on both branches is fine.
        build(
            r#"
            stencil s(a: Field[f64], b: Field[f64]) {
                with computation(PARALLEL), interval(...) {
                    if a > 0 { t = 1 } else { t = 2 }
                    b = t
                }
            }"#,
            &Externals::new(),
        )
        .unwrap();
    }

    #[test]
    fn first_assignment_under_if_does_not_read_the_temporary() {
        let ctx = build(
            r#"
            stencil s(a: Field[f64], b: Field[f64]) {
                with computation(PARALLEL), interval(...) {
                    if a > 0 { t = 1 } else { t = 2 }
                    b = t
                }
            }"#,
            &Externals::new(),
        )
        .unwrap();
        let stmts = &ctx.stencil.blocks[0].intervals[0].stmts;
        let c = Expr::field(stmts[0].target, Offset::zero());
        let t = Expr::field(Id::new("t"), Offset::zero());
        assert_eq!(
            stmts[1].value,
            Expr::Cond {
                cond: Box::new(c.clone()),
                then: Box::new(Expr::Lit(Literal::Int(1))),
                els: Box::new(Expr::Lit(Literal::Float(0.0))),
            }
        );
        // The else branch keeps what the then branch computed.
        assert_eq!(
            stmts[2].value,
            Expr::Cond {
                cond: Box::new(c),
                then: Box::new(t),
                els: Box::new(Expr::Lit(Literal::Int(2))),
            }
        );
    }

    #[test]
    fn name_errors() {
        let msg = grammar_error(
            "stencil s(a: Field[f64]) { with computation(PARALLEL), interval(...) { a = t } }",
        );
        assert!(msg.contains("Undefined field name: t"), "{msg}");
        let msg = grammar_error(
            "stencil s(a: Field[f64], *, w: f64) { with computation(PARALLEL), interval(...) { w = a } }",
        );
        assert!(msg.contains("scalar parameter"), "{msg}");
        let msg = grammar_error(
            "stencil s(a: Field[f64], c: Field[f64, ()]) { with computation(PARALLEL), interval(...) { a = c[1, 0, 0] } }",
        );
        assert!(msg.contains("0-D field"), "{msg}");
        let msg = grammar_error(
            "stencil s(a: Field[f64], b: Field[f64]) { with computation(PARALLEL), interval(...) { a[1, 0, 0] = b } }",
        );
        assert!(msg.contains("offset [0, 0, 0]"), "{msg}");
        let msg = grammar_error(
            "stencil s(a: Field[f64]) { with computation(SIDEWAYS), interval(...) { a = 1 } }",
        );
        assert!(msg.contains("Unknown iteration policy"), "{msg}");
        let msg = grammar_error("stencil s(a: Field[f64], a: Field[f64]) {}");
        assert!(msg.contains("already bound"), "{msg}");
    }

    #[test]
    fn signature_overrides_types() {
        let ns = StrataParser::parse_str(
            "sig",
            "stencil s(a: Field[f64], *, w: f64) {}",
        )
        .unwrap();
        let sig = TypeSignature::new()
            .with("a", DataType::F32)
            .with("w", DataType::I32);
        let ctx = ast_to_ir(&ns.stencils[0], &Externals::new(), &sig).unwrap();
        assert_eq!(ctx.stencil.fields[&Id::new("a")].dtype, DataType::F32);
        assert_eq!(ctx.stencil.scalars[&Id::new("w")].dtype, DataType::I32);
        let bad = TypeSignature::new().with("zzz", DataType::F32);
        assert!(ast_to_ir(&ns.stencils[0], &Externals::new(), &bad).is_err());
    }
}
