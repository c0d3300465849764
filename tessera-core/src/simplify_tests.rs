//! Tests for the algebraic simplifier.

use crate::ir::{BinOp, Expr, ForKind, ScalarKind, Type};
use crate::simplify::simplify;

fn ivar(name: &str) -> Expr {
    Expr::var(name, Type::i32())
}

fn binop(op: BinOp, a: Expr, b: Expr) -> Expr {
    Expr::binary(op, a, b)
}

fn simplified(mut e: Expr) -> Expr {
    simplify(&mut e);
    e
}

#[test]
fn folds_integer_arithmetic() {
    assert_eq!(
        simplified(binop(BinOp::Add, Expr::int(2), Expr::int(3))),
        Expr::int(5)
    );
    assert_eq!(
        simplified(binop(BinOp::Div, Expr::int(16), Expr::int(4))),
        Expr::int(4)
    );
    assert_eq!(
        simplified(binop(BinOp::Mod, Expr::int(7), Expr::int(4))),
        Expr::int(3)
    );
    assert_eq!(
        simplified(binop(BinOp::Min, Expr::int(7), Expr::int(4))),
        Expr::int(4)
    );
}

#[test]
fn division_truncates_toward_zero() {
    assert_eq!(
        simplified(binop(BinOp::Div, Expr::int(17), Expr::int(4))),
        Expr::int(4)
    );
    assert_eq!(
        simplified(binop(BinOp::Div, Expr::int(-17), Expr::int(4))),
        Expr::int(-4)
    );
}

#[test]
fn folds_nested_expressions() {
    // 2 + 3 * 4
    let e = binop(
        BinOp::Add,
        Expr::int(2),
        binop(BinOp::Mul, Expr::int(3), Expr::int(4)),
    );
    assert_eq!(simplified(e), Expr::int(14));
}

#[test]
fn folds_comparisons_to_bool() {
    let folded = simplified(binop(BinOp::Lt, Expr::int(2), Expr::int(3)));
    assert_eq!(folded.as_int(), Some(1));
    assert_eq!(folded.ty, Type::bool());

    let folded = simplified(binop(BinOp::Ge, Expr::int(2), Expr::int(3)));
    assert_eq!(folded.as_int(), Some(0));
}

#[test]
fn applies_identities() {
    let x = || ivar("x");
    assert_eq!(simplified(binop(BinOp::Add, x(), Expr::int(0))), x());
    assert_eq!(simplified(binop(BinOp::Add, Expr::int(0), x())), x());
    assert_eq!(simplified(binop(BinOp::Sub, x(), Expr::int(0))), x());
    assert_eq!(simplified(binop(BinOp::Mul, x(), Expr::int(1))), x());
    assert_eq!(simplified(binop(BinOp::Mul, Expr::int(1), x())), x());
    assert_eq!(simplified(binop(BinOp::Div, x(), Expr::int(1))), x());
    assert_eq!(
        simplified(binop(BinOp::Mul, x(), Expr::int(0))),
        Expr::int(0)
    );
}

#[test]
fn folds_float_arithmetic() {
    let e = binop(BinOp::Mul, Expr::float(2.5), Expr::float(4.0));
    assert_eq!(simplified(e), Expr::float(10.0));
}

#[test]
fn leaves_division_by_zero() {
    let e = binop(BinOp::Div, ivar("x"), Expr::int(0));
    assert_eq!(simplified(e.clone()), e);
    let e = binop(BinOp::Div, Expr::int(4), Expr::int(0));
    assert_eq!(simplified(e.clone()), e);
}

#[test]
fn folds_select_on_constant_condition() {
    let cond = Expr::int_of(1, Type::bool());
    let e = Expr::select(cond, ivar("a"), ivar("b"));
    assert_eq!(simplified(e), ivar("a"));

    let cond = Expr::int_of(0, Type::bool());
    let e = Expr::select(cond, ivar("a"), ivar("b"));
    assert_eq!(simplified(e), ivar("b"));
}

#[test]
fn recurses_into_loops_and_stores() {
    let body = Expr::store(
        "a",
        binop(BinOp::Add, Expr::int(1), Expr::int(2)),
        vec![ivar("i")],
    );
    let loop_ = Expr::for_loop(
        "i",
        Expr::int(0),
        binop(BinOp::Div, Expr::int(16), Expr::int(4)),
        ForKind::Serial,
        body,
    );
    let expected = Expr::for_loop(
        "i",
        Expr::int(0),
        Expr::int(4),
        ForKind::Serial,
        Expr::store("a", Expr::int(3), vec![ivar("i")]),
    );
    assert_eq!(simplified(loop_), expected);
}

#[test]
fn recurses_into_ramp_operands() {
    let e = Expr::ramp(
        binop(BinOp::Add, Expr::int(1), Expr::int(2)),
        Expr::int(1),
        4,
    );
    assert_eq!(simplified(e), Expr::ramp(Expr::int(3), Expr::int(1), 4));
}

#[test]
fn is_idempotent() {
    let exprs = vec![
        binop(BinOp::Add, ivar("x"), Expr::int(0)),
        binop(
            BinOp::Div,
            binop(BinOp::Mul, Expr::int(6), ivar("n")),
            Expr::int(1),
        ),
        Expr::cast(binop(BinOp::Add, Expr::int(2), Expr::int(2)), ScalarKind::Float(32)),
    ];
    for e in exprs {
        let once = simplified(e);
        let twice = simplified(once.clone());
        assert_eq!(once, twice);
    }
}
