//! Loop vectorization.
//!
//! Rewrites a loop nest so that the innermost iteration of a loop marked
//! `Vectorized` is expressed as SIMD-lane-wide operations. The driver finds
//! vectorized loops top-down, splits each by its factor into an outer serial
//! loop and an inner candidate loop, and hands the inner body to the
//! [`Vectorizer`], which substitutes the identity ramp for the induction
//! variable and lifts every subtree to the full lane width.
//!
//! Subtrees that cannot be widened fall back to scalarization: the body is
//! re-emitted under a fresh serial loop of length equal to the lane width,
//! so the pass never produces an unexecutable tree.

use crate::diags;
use crate::error::Result;
use crate::ir::{BinOp, Expr, ExprKind, ForKind, ForLoop, Type, VectorizeInfo};
use crate::simplify::simplify;
use crate::substitute::substitute;
use crate::target::Target;
use crate::{bail_precondition, bail_vectorize, err_precondition};
use crate::{Context, VECTORIZED_FORLOOP_COUNT};

/// Widen an expression to the given number of lanes.
///
/// A value already at the requested width passes through; a broadcast widens
/// to any multiple of its width; a scalar is broadcast. Anything else cannot
/// be widened and is an error (the vectorizer responds by scalarizing).
pub fn widen(e: Expr, lanes: u32) -> Result<Expr> {
    if !widenable(&e, lanes) {
        bail_vectorize!(
            "cannot widen {} from {} to {} lanes",
            diags::format_expr(&e),
            e.ty.lanes,
            lanes
        );
    }
    Ok(widen_unchecked(e, lanes))
}

fn widenable(e: &Expr, lanes: u32) -> bool {
    if e.ty.lanes == lanes {
        return true;
    }
    if let ExprKind::Broadcast { lanes: inner, .. } = &e.kind {
        if lanes % inner == 0 {
            return true;
        }
    }
    e.ty.lanes == 1
}

fn widen_unchecked(e: Expr, lanes: u32) -> Expr {
    if e.ty.lanes == lanes {
        return e;
    }
    // Nested broadcasts flatten instead of stacking.
    if let ExprKind::Broadcast { value, .. } = e.kind {
        return Expr::broadcast(*value, lanes);
    }
    Expr::broadcast(e, lanes)
}

/// Substitutes the identity ramp for a scalar loop variable and widens the
/// surrounding expression tree to the target lane width.
pub struct Vectorizer {
    /// The loop variable being eliminated.
    var: String,
    lanes: u32,
    /// `ramp(0, 1, lanes)`, the value of the loop variable across lanes.
    ramp: Expr,
    need_scalarize: bool,
}

impl Vectorizer {
    pub fn new(var: impl Into<String>, lanes: u32) -> Self {
        let ramp = Expr::ramp(Expr::int(0), Expr::int(1), lanes);
        Vectorizer {
            var: var.into(),
            lanes,
            ramp,
            need_scalarize: false,
        }
    }

    /// Rewrite `expr` in place. If any subtree raised the scalarize flag the
    /// whole expression is replaced by the serial fallback instead.
    pub fn visit(&mut self, expr: &mut Expr) {
        // Scalarization must re-run the original body; a tree that already
        // contains the identity ramp would double-apply the induction.
        let snapshot = expr.clone();
        self.visit_expr(expr);
        if self.need_scalarize {
            self.need_scalarize = false;
            *expr = self.scalarize(snapshot);
        }
    }

    /// Re-emit `body` under a serial loop over `[0, lanes)`, with the
    /// vectorized variable redirected to the fresh loop index.
    fn scalarize(&self, mut body: Expr) -> Expr {
        let index = format!("{}_s", self.var);
        substitute(&mut body, &self.var, &Expr::var(index.clone(), Type::i32()));
        Expr::for_loop(
            index,
            Expr::int(0),
            Expr::int(self.lanes as i64),
            ForKind::Serial,
            body,
        )
    }

    /// Returns whether the node changed.
    fn visit_expr(&mut self, expr: &mut Expr) -> bool {
        match &mut expr.kind {
            ExprKind::IntImm(_) | ExprKind::FloatImm(_) => false,
            ExprKind::Var(name) => {
                let is_target = *name == self.var;
                if is_target {
                    *expr = self.ramp.clone();
                }
                is_target
            }
            // Ramps are terminal: they were produced by this pass or by
            // upstream and carry no occurrence of the loop variable.
            ExprKind::Ramp { .. } => false,
            ExprKind::Cast(_) => self.visit_cast(expr),
            ExprKind::Binary { op, .. } => {
                let rewrite: fn(BinOp, Expr, Expr, u32) -> Expr = match op {
                    BinOp::Add | BinOp::Sub => rewrite_add_sub,
                    BinOp::Mul | BinOp::Div => rewrite_mul_div,
                    _ => rewrite_binary,
                };
                self.visit_binary(expr, rewrite)
            }
            ExprKind::Select { .. } => self.visit_select(expr),
            ExprKind::Load { .. } => self.visit_load(expr),
            ExprKind::Store { .. } => self.visit_store(expr),
            ExprKind::Broadcast { .. } => self.visit_broadcast(expr),
            ExprKind::Call { .. } => {
                log::error!("call {} is not widened", diags::format_expr(expr));
                false
            }
            ExprKind::Let { .. } => {
                log::error!(
                    "let-binding in vectorized body is not supported: {}",
                    diags::format_expr(expr)
                );
                false
            }
            ExprKind::IfThenElse { .. } => self.visit_if_then_else(expr),
            ExprKind::For(f) => {
                // Nested loops are walked but never vectorized here; only
                // the driver decides which loops to widen.
                let mut changed = self.visit_expr(&mut f.min);
                changed |= self.visit_expr(&mut f.extent);
                changed |= self.visit_expr(&mut f.body);
                changed
            }
            ExprKind::Block(stmts) => {
                let mut changed = false;
                for s in stmts {
                    changed |= self.visit_expr(s);
                }
                changed
            }
        }
    }

    fn visit_cast(&mut self, expr: &mut Expr) -> bool {
        let ExprKind::Cast(value) = &mut expr.kind else {
            unreachable!()
        };
        if !self.visit_expr(value) {
            return false;
        }
        let lanes = value.ty.lanes;
        expr.ty = expr.ty.with_lanes(lanes);
        true
    }

    fn visit_binary(
        &mut self,
        expr: &mut Expr,
        rewrite: fn(BinOp, Expr, Expr, u32) -> Expr,
    ) -> bool {
        let ExprKind::Binary { a, b, .. } = &mut expr.kind else {
            unreachable!()
        };
        let mut changed = self.visit_expr(a);
        changed |= self.visit_expr(b);
        if !changed {
            return false;
        }
        let lanes = a.ty.lanes.max(b.ty.lanes);
        let ok = widenable(a, lanes) && widenable(b, lanes);
        if !ok {
            self.flag_unwidenable(expr, lanes);
            return true;
        }
        let ExprKind::Binary { op, a, b } = std::mem::take(&mut expr.kind) else {
            unreachable!()
        };
        *expr = rewrite(op, *a, *b, lanes);
        true
    }

    fn visit_select(&mut self, expr: &mut Expr) -> bool {
        let ExprKind::Select {
            cond,
            true_value,
            false_value,
        } = &mut expr.kind
        else {
            unreachable!()
        };
        let mut changed = self.visit_expr(cond);
        changed |= self.visit_expr(true_value);
        changed |= self.visit_expr(false_value);
        if !changed {
            return false;
        }
        let lanes = cond
            .ty
            .lanes
            .max(true_value.ty.lanes)
            .max(false_value.ty.lanes);
        // The condition keeps its own width (scalar or full); only the
        // branches are widened.
        let ok = widenable(true_value, lanes) && widenable(false_value, lanes);
        if !ok {
            self.flag_unwidenable(expr, lanes);
            return true;
        }
        let ExprKind::Select {
            cond,
            true_value,
            false_value,
        } = std::mem::take(&mut expr.kind)
        else {
            unreachable!()
        };
        *expr = Expr::select(
            *cond,
            widen_unchecked(*true_value, lanes),
            widen_unchecked(*false_value, lanes),
        );
        true
    }

    fn visit_load(&mut self, expr: &mut Expr) -> bool {
        let ExprKind::Load { indices, .. } = &mut expr.kind else {
            unreachable!()
        };
        let mut changed = false;
        for index in indices.iter_mut() {
            changed |= self.visit_expr(index);
        }
        if !changed {
            return false;
        }
        let lanes = indices.iter().map(|i| i.ty.lanes).max().unwrap_or(1);
        expr.ty = expr.ty.with_lanes(lanes);
        true
    }

    fn visit_store(&mut self, expr: &mut Expr) -> bool {
        let ExprKind::Store { value, indices, .. } = &mut expr.kind else {
            unreachable!()
        };
        let value_changed = self.visit_expr(value);
        let mut index_changed = false;
        for index in indices.iter_mut() {
            index_changed |= self.visit_expr(index);
        }
        if !index_changed {
            return value_changed;
        }
        let mut lanes = value.ty.lanes;
        for index in indices.iter() {
            lanes = lanes.max(index.ty.lanes);
        }
        let ok = widenable(value, lanes) && indices.iter().all(|i| widenable(i, lanes));
        if !ok {
            self.flag_unwidenable(expr, lanes);
            return true;
        }
        let ExprKind::Store {
            tensor,
            value,
            indices,
        } = std::mem::take(&mut expr.kind)
        else {
            unreachable!()
        };
        let indices = indices
            .into_iter()
            .map(|i| widen_unchecked(i, lanes))
            .collect();
        *expr = Expr::store(tensor, widen_unchecked(*value, lanes), indices);
        true
    }

    fn visit_broadcast(&mut self, expr: &mut Expr) -> bool {
        let ExprKind::Broadcast { value, .. } = &mut expr.kind else {
            unreachable!()
        };
        if !self.visit_expr(value) {
            return false;
        }
        let bad = !value.ty.is_scalar();
        if bad {
            // The loop variable appeared under a broadcast; the node no
            // longer has a scalar payload and must re-run serially.
            self.flag_unwidenable(expr, self.lanes);
        }
        true
    }

    fn visit_if_then_else(&mut self, expr: &mut Expr) -> bool {
        let ExprKind::IfThenElse {
            cond,
            then_case,
            else_case,
        } = &mut expr.kind
        else {
            unreachable!()
        };
        let mut changed = self.visit_expr(cond);
        changed |= self.visit_expr(then_case);
        if let Some(e) = else_case {
            changed |= self.visit_expr(e);
        }
        log::error!("if-then-else in vectorized body is not widened; scalarizing");
        self.need_scalarize = true;
        changed
    }

    fn flag_unwidenable(&mut self, expr: &Expr, lanes: u32) {
        log::error!(
            "cannot widen {} to {} lanes; scalarizing",
            diags::format_expr(expr),
            lanes
        );
        self.need_scalarize = true;
    }
}

// s + ramp(base, stride, n)      = ramp(s + base, stride, n)
// ramp(base, stride, n) +/- s    = ramp(base +/- s, stride, n)
// s - ramp(...) has no fold with an unchanged stride and widens instead.
fn rewrite_add_sub(op: BinOp, a: Expr, b: Expr, lanes: u32) -> Expr {
    if lanes != 1 {
        if op == BinOp::Add && a.ty.is_scalar() && b.is_ramp() {
            let ExprKind::Ramp {
                base,
                stride,
                lanes: n,
            } = b.kind
            else {
                unreachable!()
            };
            return Expr::ramp(Expr::binary(op, a, *base), *stride, n);
        }
        if b.ty.is_scalar() && a.is_ramp() {
            let ExprKind::Ramp {
                base,
                stride,
                lanes: n,
            } = a.kind
            else {
                unreachable!()
            };
            return Expr::ramp(Expr::binary(op, *base, b), *stride, n);
        }
    }
    Expr::binary(op, widen_unchecked(a, lanes), widen_unchecked(b, lanes))
}

// s * ramp(base, stride, n)    = ramp(s * base, s * stride, n)
// ramp(base, stride, n) op s   = ramp(base op s, stride op s, n)
// Division folds only through a scalar divisor.
fn rewrite_mul_div(op: BinOp, a: Expr, b: Expr, lanes: u32) -> Expr {
    if lanes != 1 {
        if op == BinOp::Mul && a.ty.is_scalar() && b.is_ramp() {
            let ExprKind::Ramp {
                base,
                stride,
                lanes: n,
            } = b.kind
            else {
                unreachable!()
            };
            return Expr::ramp(
                Expr::binary(op, a.clone(), *base),
                Expr::binary(op, a, *stride),
                n,
            );
        }
        if b.ty.is_scalar() && a.is_ramp() {
            let ExprKind::Ramp {
                base,
                stride,
                lanes: n,
            } = a.kind
            else {
                unreachable!()
            };
            return Expr::ramp(
                Expr::binary(op, *base, b.clone()),
                Expr::binary(op, *stride, b),
                n,
            );
        }
    }
    Expr::binary(op, widen_unchecked(a, lanes), widen_unchecked(b, lanes))
}

fn rewrite_binary(op: BinOp, a: Expr, b: Expr, lanes: u32) -> Expr {
    Expr::binary(op, widen_unchecked(a, lanes), widen_unchecked(b, lanes))
}

/// Split a vectorized loop `for v in [0, extent)` with factor F into an
/// outer serial loop over `extent / F` and an inner vectorized loop of
/// extent F, rewriting `v` as `v*F + vi` in the body.
///
/// Returns `None` without touching the loop when its minimum is not the
/// literal 0 (the driver then proceeds without vectorizing). On success the
/// outer loop is updated in place and the inner loop is returned; the driver
/// installs the inner body back into the outer loop once it is vectorized.
fn split_for_loop(f: &mut ForLoop, factor: u32, ctx: &mut Context) -> Result<Option<ForLoop>> {
    if factor <= 1 {
        bail_precondition!(
            "vectorize factor {} of loop over {} must be greater than 1",
            factor,
            f.var
        );
    }
    // Loops produced by polyhedral analysis can carry a non-zero minimum;
    // those decline the split.
    match f.min.as_int() {
        Some(0) => {}
        _ => return Ok(None),
    }

    let mut times = Expr::binary(BinOp::Div, (*f.extent).clone(), Expr::int(factor as i64));
    simplify(&mut times);

    f.extent = Box::new(times);
    f.kind = ForKind::Serial;
    f.vectorize = None;

    let inner_var = ctx.fresh_name("vi");
    let new_index = Expr::binary(
        BinOp::Add,
        Expr::binary(
            BinOp::Mul,
            Expr::var(f.var.clone(), Type::i32()),
            Expr::int(factor as i64),
        ),
        Expr::var(inner_var.clone(), Type::i32()),
    );
    substitute(&mut f.body, &f.var, &new_index);

    let body = std::mem::replace(&mut f.body, Box::new(Expr::block(Vec::new())));
    Ok(Some(ForLoop {
        var: inner_var,
        min: Box::new(Expr::int(0)),
        extent: Box::new(Expr::int(factor as i64)),
        kind: ForKind::Vectorized,
        vectorize: Some(VectorizeInfo::new(factor)),
        body,
    }))
}

fn contains_vectorized(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::For(f) => f.is_vectorized() || contains_vectorized(&f.body),
        ExprKind::Block(stmts) => stmts.iter().any(contains_vectorized),
        ExprKind::Let { body, .. } => contains_vectorized(body),
        ExprKind::IfThenElse {
            then_case,
            else_case,
            ..
        } => {
            contains_vectorized(then_case)
                || else_case.as_deref().is_some_and(contains_vectorized)
        }
        _ => false,
    }
}

/// Top-down loop discovery: splits and vectorizes every `Vectorized` loop,
/// recursing into serial loop bodies.
struct LoopVectorizer<'a> {
    ctx: &'a mut Context,
}

impl LoopVectorizer<'_> {
    fn visit(&mut self, expr: &mut Expr) -> Result<()> {
        if let ExprKind::For(f) = &mut expr.kind {
            return self.visit_for(f);
        }
        // Loops are statements; only statement-bearing nodes can hold them.
        match &mut expr.kind {
            ExprKind::Block(stmts) => {
                for s in stmts {
                    self.visit(s)?;
                }
            }
            ExprKind::Let { value, body, .. } => {
                self.visit(value)?;
                self.visit(body)?;
            }
            ExprKind::IfThenElse {
                cond,
                then_case,
                else_case,
            } => {
                self.visit(cond)?;
                self.visit(then_case)?;
                if let Some(e) = else_case {
                    self.visit(e)?;
                }
            }
            ExprKind::Store { value, indices, .. } => {
                self.visit(value)?;
                for index in indices {
                    self.visit(index)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn visit_for(&mut self, f: &mut ForLoop) -> Result<()> {
        if !f.is_vectorized() {
            return self.visit(&mut f.body);
        }

        self.ctx.bump(VECTORIZED_FORLOOP_COUNT);

        let info = f.vectorize.ok_or_else(|| {
            err_precondition!("vectorized loop over {} carries no vectorize info", f.var)
        })?;
        if !info.valid() {
            bail_precondition!(
                "vectorized loop over {} has invalid factor {}",
                f.var,
                info.factor
            );
        }

        let Some(mut inner) = split_for_loop(f, info.factor, self.ctx)? else {
            log::debug!(
                "loop over {} does not start at 0; skipping vectorization",
                f.var
            );
            return self.visit(&mut f.body);
        };

        if contains_vectorized(&inner.body) {
            bail_precondition!(
                "nested vectorized loop inside vectorized loop over {}",
                f.var
            );
        }

        let extent = inner.extent.as_int().ok_or_else(|| {
            err_precondition!(
                "vectorized loop over {} has non-literal extent {}",
                inner.var,
                diags::format_expr(&inner.extent)
            )
        })?;
        if extent <= 1 {
            bail_precondition!(
                "loop over {} has extent {}; can only vectorize a constant extent > 1",
                inner.var,
                extent
            );
        }

        log::debug!("vectorizing {} with {} lanes", inner.var, extent);
        let mut vectorizer = Vectorizer::new(inner.var.clone(), extent as u32);
        vectorizer.visit(&mut inner.body);
        log::debug!("vectorized body: {}", diags::format_expr(&inner.body));

        // The inner loop node is dropped; the identity ramp now carries the
        // induction.
        f.body = inner.body;
        Ok(())
    }
}

/// Vectorize every `Vectorized` loop in the tree rooted at `root`.
///
/// `target` is reserved for target-specific widening policy and is not
/// consulted by the current rules.
pub fn vectorize_loops(root: &mut Expr, _target: &Target, ctx: &mut Context) -> Result<()> {
    LoopVectorizer { ctx }.visit(root)
}

/// Low-level entry: substitute the identity ramp for `var` and widen `expr`
/// to `lanes` directly, without loop discovery or splitting.
pub fn vectorize(var: &str, lanes: u32, expr: &mut Expr) {
    Vectorizer::new(var, lanes).visit(expr);
}
