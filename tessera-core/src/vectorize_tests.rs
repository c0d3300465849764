//! Tests for the vectorizer rewrite rules and the widen helper.
//!
//! These drive the low-level [`vectorize`] entry directly: the vectorized
//! variable is `i` and the lane width is 4 unless a test says otherwise.

use crate::eval::Interp;
use crate::ir::{BinOp, Expr, ExprKind, ForKind, ScalarKind, Type};
use crate::simplify::simplify;
use crate::vectorize::{vectorize, widen};

fn ivar(name: &str) -> Expr {
    Expr::var(name, Type::i32())
}

fn binop(op: BinOp, a: Expr, b: Expr) -> Expr {
    Expr::binary(op, a, b)
}

fn load(buf: &str, index: Expr) -> Expr {
    Expr::load(buf, ScalarKind::Int(32), vec![index])
}

/// Vectorize `i` to 4 lanes.
fn vec4(mut e: Expr) -> Expr {
    vectorize("i", 4, &mut e);
    e
}

/// Vectorize `i` to 4 lanes, then simplify (folds the literal arithmetic the
/// ramp rules leave behind).
fn vec4s(e: Expr) -> Expr {
    let mut e = vec4(e);
    simplify(&mut e);
    e
}

// =============================================================================
// widen
// =============================================================================

#[test]
fn widen_passes_through_matching_width() {
    let r = Expr::ramp(Expr::int(0), Expr::int(1), 4);
    assert_eq!(widen(r.clone(), 4).unwrap(), r);
}

#[test]
fn widen_broadcasts_scalars() {
    let w = widen(Expr::int(3), 4).unwrap();
    assert_eq!(w, Expr::broadcast(Expr::int(3), 4));
    assert_eq!(w.ty.lanes, 4);
}

#[test]
fn widen_flattens_nested_broadcasts() {
    let b = Expr::broadcast(ivar("x"), 2);
    assert_eq!(widen(b, 4).unwrap(), Expr::broadcast(ivar("x"), 4));
}

#[test]
fn widen_rejects_incompatible_vectors() {
    let r = Expr::ramp(Expr::int(0), Expr::int(1), 4);
    assert!(widen(r, 8).is_err());
    let b = Expr::broadcast(ivar("x"), 3);
    assert!(widen(b, 4).is_err());
}

// =============================================================================
// variable substitution and the same-as skip
// =============================================================================

#[test]
fn variable_becomes_identity_ramp() {
    let out = vec4(ivar("i"));
    assert_eq!(out, Expr::ramp(Expr::int(0), Expr::int(1), 4));
}

#[test]
fn unrelated_expressions_are_untouched() {
    let e = binop(BinOp::Add, Expr::int(5), ivar("x"));
    assert_eq!(vec4(e.clone()), e);

    let e = Expr::store("a", load("b", ivar("j")), vec![ivar("j")]);
    assert_eq!(vec4(e.clone()), e);
}

// =============================================================================
// ramp algebra
// =============================================================================

#[test]
fn scalar_plus_ramp_folds() {
    let out = vec4s(binop(BinOp::Add, Expr::int(5), ivar("i")));
    assert_eq!(out, Expr::ramp(Expr::int(5), Expr::int(1), 4));
}

#[test]
fn ramp_plus_scalar_folds() {
    let out = vec4s(binop(BinOp::Add, ivar("i"), Expr::int(5)));
    assert_eq!(out, Expr::ramp(Expr::int(5), Expr::int(1), 4));
}

#[test]
fn ramp_minus_scalar_folds() {
    let out = vec4s(binop(BinOp::Sub, ivar("i"), Expr::int(2)));
    assert_eq!(out, Expr::ramp(Expr::int(-2), Expr::int(1), 4));
}

#[test]
fn scalar_minus_ramp_widens() {
    // 2 - i has no ramp fold with an unchanged stride; it must widen.
    let out = vec4(binop(BinOp::Sub, Expr::int(2), ivar("i")));
    let ExprKind::Binary { op, a, b } = &out.kind else {
        panic!("expected a binary node, got {:?}", out);
    };
    assert_eq!(*op, BinOp::Sub);
    assert!(matches!(a.kind, ExprKind::Broadcast { .. }));
    assert!(matches!(b.kind, ExprKind::Ramp { .. }));

    let mut interp = Interp::new();
    assert_eq!(interp.eval(&out).unwrap(), vec![2, 1, 0, -1]);
}

#[test]
fn scalar_times_ramp_folds() {
    let out = vec4s(binop(BinOp::Mul, Expr::int(3), ivar("i")));
    assert_eq!(out, Expr::ramp(Expr::int(0), Expr::int(3), 4));
}

#[test]
fn ramp_times_scalar_folds() {
    let out = vec4s(binop(BinOp::Mul, ivar("i"), Expr::int(3)));
    assert_eq!(out, Expr::ramp(Expr::int(0), Expr::int(3), 4));
}

#[test]
fn ramp_div_scalar_folds() {
    let out = vec4s(binop(BinOp::Div, ivar("i"), Expr::int(2)));
    assert_eq!(out, Expr::ramp(Expr::int(0), Expr::int(0), 4));
}

#[test]
fn scalar_div_ramp_widens() {
    let out = vec4(binop(BinOp::Div, Expr::int(2), ivar("i")));
    let ExprKind::Binary { op, a, b } = &out.kind else {
        panic!("expected a binary node, got {:?}", out);
    };
    assert_eq!(*op, BinOp::Div);
    assert!(matches!(a.kind, ExprKind::Broadcast { .. }));
    assert!(matches!(b.kind, ExprKind::Ramp { .. }));
}

#[test]
fn affine_body_folds_to_single_ramp() {
    // 2*i + 3 over 8 lanes
    let mut e = binop(
        BinOp::Add,
        binop(BinOp::Mul, Expr::int(2), ivar("i")),
        Expr::int(3),
    );
    vectorize("i", 8, &mut e);
    simplify(&mut e);
    assert_eq!(e, Expr::ramp(Expr::int(3), Expr::int(2), 8));
}

// =============================================================================
// plain widening operators
// =============================================================================

#[test]
fn modulo_widens_both_operands() {
    let out = vec4(binop(BinOp::Mod, ivar("i"), Expr::int(3)));
    let expected = binop(
        BinOp::Mod,
        Expr::ramp(Expr::int(0), Expr::int(1), 4),
        Expr::broadcast(Expr::int(3), 4),
    );
    assert_eq!(out, expected);
}

#[test]
fn min_widens_without_folding() {
    let out = vec4(binop(BinOp::Min, ivar("i"), Expr::int(7)));
    let expected = binop(
        BinOp::Min,
        Expr::ramp(Expr::int(0), Expr::int(1), 4),
        Expr::broadcast(Expr::int(7), 4),
    );
    assert_eq!(out, expected);
}

#[test]
fn comparison_produces_wide_bool() {
    let out = vec4(binop(BinOp::Lt, ivar("i"), Expr::int(3)));
    assert_eq!(out.ty, Type::vector(ScalarKind::Bool, 4));
}

#[test]
fn select_widens_branches_only() {
    let e = Expr::select(binop(BinOp::Lt, ivar("i"), Expr::int(2)), ivar("i"), Expr::int(9));
    let out = vec4(e);
    assert_eq!(out.ty, Type::vector(ScalarKind::Int(32), 4));
    let ExprKind::Select {
        cond,
        true_value,
        false_value,
    } = &out.kind
    else {
        panic!("expected a select node, got {:?}", out);
    };
    assert_eq!(cond.ty, Type::vector(ScalarKind::Bool, 4));
    assert!(matches!(true_value.kind, ExprKind::Ramp { .. }));
    assert_eq!(**false_value, Expr::broadcast(Expr::int(9), 4));
}

#[test]
fn cast_tracks_operand_lanes() {
    let out = vec4(Expr::cast(ivar("i"), ScalarKind::Float(32)));
    assert_eq!(out.ty, Type::vector(ScalarKind::Float(32), 4));
    let ExprKind::Cast(value) = &out.kind else {
        panic!("expected a cast node, got {:?}", out);
    };
    assert!(matches!(value.kind, ExprKind::Ramp { .. }));
}

#[test]
fn load_takes_index_width() {
    let out = vec4(load("b", ivar("i")));
    assert_eq!(out.ty, Type::vector(ScalarKind::Int(32), 4));
    let ExprKind::Load { indices, .. } = &out.kind else {
        panic!("expected a load node, got {:?}", out);
    };
    assert!(matches!(indices[0].kind, ExprKind::Ramp { .. }));
}

#[test]
fn store_widens_value_to_index_width() {
    let out = vec4(Expr::store("a", Expr::int(7), vec![ivar("i")]));
    let ExprKind::Store { value, indices, .. } = &out.kind else {
        panic!("expected a store node, got {:?}", out);
    };
    assert_eq!(**value, Expr::broadcast(Expr::int(7), 4));
    assert!(matches!(indices[0].kind, ExprKind::Ramp { .. }));
}

// =============================================================================
// unsupported constructs
// =============================================================================

#[test]
fn call_is_retained_and_surroundings_widen() {
    // The call stays opaque (its argument is untouched) but the addition
    // still folds it into the ramp base as a scalar.
    let call = Expr::call("f", vec![ivar("i")], Type::i32());
    let out = vec4s(binop(BinOp::Add, call.clone(), ivar("i")));
    assert_eq!(out, Expr::ramp(call, Expr::int(1), 4));
}

#[test]
fn call_widens_as_opaque_scalar() {
    let call = Expr::call("f", vec![ivar("i")], Type::i32());
    let out = vec4(binop(BinOp::Min, call.clone(), ivar("i")));
    let ExprKind::Binary { a, b, .. } = &out.kind else {
        panic!("expected a binary node, got {:?}", out);
    };
    assert_eq!(**a, Expr::broadcast(call, 4));
    assert!(matches!(b.kind, ExprKind::Ramp { .. }));
}

#[test]
fn let_binding_is_left_untouched() {
    let e = Expr::let_("t", ivar("i"), binop(BinOp::Add, ivar("t"), Expr::int(1)));
    assert_eq!(vec4(e.clone()), e);
}

// =============================================================================
// scalarization
// =============================================================================

#[test]
fn if_then_else_scalarizes_the_body() {
    let body = Expr::if_then_else(
        binop(BinOp::Lt, ivar("i"), Expr::int(2)),
        Expr::store("a", Expr::int(1), vec![ivar("i")]),
        None,
    );
    let out = vec4(body.clone());

    let mut expected_body = body;
    crate::substitute::substitute(&mut expected_body, "i", &ivar("i_s"));
    let expected = Expr::for_loop(
        "i_s",
        Expr::int(0),
        Expr::int(4),
        ForKind::Serial,
        expected_body,
    );
    assert_eq!(out, expected);
}

#[test]
fn unwidenable_operand_scalarizes() {
    // a pre-existing 2-lane ramp cannot reach 4 lanes
    let e = binop(
        BinOp::Add,
        Expr::ramp(Expr::int(0), Expr::int(1), 2),
        ivar("i"),
    );
    let out = vec4(e);
    let ExprKind::For(f) = &out.kind else {
        panic!("expected the serial fallback loop, got {:?}", out);
    };
    assert_eq!(f.var, "i_s");
    assert_eq!(f.kind, ForKind::Serial);
    assert_eq!(f.extent.as_int(), Some(4));
    // the body is the original expression, re-indexed
    assert_eq!(
        *f.body,
        binop(
            BinOp::Add,
            Expr::ramp(Expr::int(0), Expr::int(1), 2),
            ivar("i_s"),
        )
    );
}
