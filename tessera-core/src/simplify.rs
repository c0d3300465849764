//! Algebraic simplification of IR expressions.
//!
//! `simplify` canonicalizes an expression in place: integer and float
//! constants fold, arithmetic identities collapse, and constant selects pick
//! their branch. The pass is idempotent and semantics-preserving; the loop
//! splitter and the compute surface rely on it to reduce `extent / factor`
//! and shape expressions to literals when possible.

use crate::ir::{BinOp, Expr, ExprKind, Type};

/// Simplify an expression tree in place.
pub fn simplify(expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::IntImm(_) | ExprKind::FloatImm(_) | ExprKind::Var(_) => {}
        ExprKind::Cast(value) => simplify(value),
        ExprKind::Binary { a, b, .. } => {
            simplify(a);
            simplify(b);
        }
        ExprKind::Select {
            cond,
            true_value,
            false_value,
        } => {
            simplify(cond);
            simplify(true_value);
            simplify(false_value);
        }
        ExprKind::Load { indices, .. } => {
            for index in indices {
                simplify(index);
            }
        }
        ExprKind::Store { value, indices, .. } => {
            simplify(value);
            for index in indices {
                simplify(index);
            }
        }
        ExprKind::Ramp { base, stride, .. } => {
            simplify(base);
            simplify(stride);
        }
        ExprKind::Broadcast { value, .. } => simplify(value),
        ExprKind::Let { value, body, .. } => {
            simplify(value);
            simplify(body);
        }
        ExprKind::IfThenElse {
            cond,
            then_case,
            else_case,
        } => {
            simplify(cond);
            simplify(then_case);
            if let Some(e) = else_case {
                simplify(e);
            }
        }
        ExprKind::For(f) => {
            simplify(&mut f.min);
            simplify(&mut f.extent);
            simplify(&mut f.body);
        }
        ExprKind::Block(stmts) => {
            for s in stmts {
                simplify(s);
            }
        }
        ExprKind::Call { args, .. } => {
            for a in args {
                simplify(a);
            }
        }
    }

    let folded = match &expr.kind {
        ExprKind::Binary { op, a, b } => try_fold_binary(*op, a, b),
        ExprKind::Select {
            cond,
            true_value,
            false_value,
        } => try_fold_select(cond, true_value, false_value),
        _ => None,
    };
    if let Some(e) = folded {
        *expr = e;
    }
}

/// Try to fold a binary operation on literals, or apply an identity rule.
fn try_fold_binary(op: BinOp, a: &Expr, b: &Expr) -> Option<Expr> {
    if let (ExprKind::IntImm(l), ExprKind::IntImm(r)) = (&a.kind, &b.kind) {
        if a.ty.is_scalar() && b.ty.is_scalar() {
            return fold_int(op, *l, *r, a.ty);
        }
    }

    if let (ExprKind::FloatImm(l), ExprKind::FloatImm(r)) = (&a.kind, &b.kind) {
        if a.ty.is_scalar() && b.ty.is_scalar() {
            let value = match op {
                BinOp::Add => Some(l + r),
                BinOp::Sub => Some(l - r),
                BinOp::Mul => Some(l * r),
                BinOp::Div if *r != 0.0 => Some(l / r),
                _ => None,
            }?;
            return Some(Expr {
                ty: a.ty,
                kind: ExprKind::FloatImm(value),
            });
        }
    }

    // Identity rules. The literal side is always scalar; the kept operand
    // may be vector-valued, which preserves the node's type.
    match op {
        BinOp::Add => {
            if is_int_literal(a, 0) {
                return Some(b.clone());
            }
            if is_int_literal(b, 0) {
                return Some(a.clone());
            }
        }
        BinOp::Sub => {
            if is_int_literal(b, 0) {
                return Some(a.clone());
            }
        }
        BinOp::Mul => {
            if is_int_literal(a, 1) {
                return Some(b.clone());
            }
            if is_int_literal(b, 1) {
                return Some(a.clone());
            }
            if a.ty.is_scalar() && b.ty.is_scalar() {
                if is_int_literal(a, 0) || is_int_literal(b, 0) {
                    return Some(Expr::int_of(0, a.ty));
                }
            }
        }
        BinOp::Div => {
            if is_int_literal(b, 1) {
                return Some(a.clone());
            }
        }
        _ => {}
    }

    None
}

fn fold_int(op: BinOp, l: i64, r: i64, ty: Type) -> Option<Expr> {
    let arith = |v: i64| Some(Expr::int_of(v, ty));
    let pred = |v: bool| Some(Expr::int_of(v as i64, Type::bool()));
    match op {
        BinOp::Add => arith(l.wrapping_add(r)),
        BinOp::Sub => arith(l.wrapping_sub(r)),
        BinOp::Mul => arith(l.wrapping_mul(r)),
        // Truncating division, the IR's integer semantics. Division and
        // modulo by zero are left in place for downstream diagnosis.
        BinOp::Div if r != 0 => arith(l / r),
        BinOp::Div => None,
        BinOp::Mod if r != 0 => arith(l % r),
        BinOp::Mod => None,
        BinOp::Min => arith(l.min(r)),
        BinOp::Max => arith(l.max(r)),
        BinOp::Eq => pred(l == r),
        BinOp::Ne => pred(l != r),
        BinOp::Lt => pred(l < r),
        BinOp::Le => pred(l <= r),
        BinOp::Gt => pred(l > r),
        BinOp::Ge => pred(l >= r),
        BinOp::And => pred(l != 0 && r != 0),
        BinOp::Or => pred(l != 0 || r != 0),
    }
}

fn try_fold_select(cond: &Expr, true_value: &Expr, false_value: &Expr) -> Option<Expr> {
    if !cond.ty.is_scalar() {
        return None;
    }
    match cond.as_int() {
        Some(0) => Some(false_value.clone()),
        Some(_) => Some(true_value.clone()),
        None => None,
    }
}

fn is_int_literal(expr: &Expr, value: i64) -> bool {
    expr.ty.is_scalar() && expr.as_int() == Some(value)
}
