//! Diagnostic formatting for IR types and expressions.
//!
//! Produces a compact, near-surface rendering used in log lines, error
//! messages, and test failure output. This is not a serialization format.

use crate::ir::{Expr, ExprKind, ForKind, ScalarKind, Type};
use std::fmt::Write;

/// Render a type, e.g. `i32`, `f32x4`, `bool`, `void`.
pub fn format_type(ty: &Type) -> String {
    let base = match ty.kind {
        ScalarKind::Void => "void".to_string(),
        ScalarKind::Bool => "bool".to_string(),
        ScalarKind::Int(bits) => format!("i{}", bits),
        ScalarKind::UInt(bits) => format!("u{}", bits),
        ScalarKind::Float(bits) => format!("f{}", bits),
    };
    if ty.lanes > 1 {
        format!("{}x{}", base, ty.lanes)
    } else {
        base
    }
}

/// Render an expression on a single line.
pub fn format_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

fn write_expr(out: &mut String, expr: &Expr) {
    match &expr.kind {
        ExprKind::IntImm(v) => {
            let _ = write!(out, "{}", v);
        }
        ExprKind::FloatImm(v) => {
            let _ = write!(out, "{}", v);
        }
        ExprKind::Var(name) => out.push_str(name),
        ExprKind::Cast(value) => {
            let _ = write!(out, "{}(", format_type(&expr.ty));
            write_expr(out, value);
            out.push(')');
        }
        ExprKind::Binary { op, a, b } => {
            if matches!(op, crate::ir::BinOp::Min | crate::ir::BinOp::Max) {
                out.push_str(op.symbol());
                out.push('(');
                write_expr(out, a);
                out.push_str(", ");
                write_expr(out, b);
                out.push(')');
            } else {
                out.push('(');
                write_expr(out, a);
                let _ = write!(out, " {} ", op.symbol());
                write_expr(out, b);
                out.push(')');
            }
        }
        ExprKind::Select {
            cond,
            true_value,
            false_value,
        } => {
            out.push_str("select(");
            write_expr(out, cond);
            out.push_str(", ");
            write_expr(out, true_value);
            out.push_str(", ");
            write_expr(out, false_value);
            out.push(')');
        }
        ExprKind::Load { tensor, indices } => {
            out.push_str(tensor);
            out.push('[');
            write_list(out, indices);
            out.push(']');
        }
        ExprKind::Store {
            tensor,
            value,
            indices,
        } => {
            out.push_str(tensor);
            out.push('[');
            write_list(out, indices);
            out.push_str("] = ");
            write_expr(out, value);
        }
        ExprKind::Ramp {
            base,
            stride,
            lanes,
        } => {
            out.push_str("ramp(");
            write_expr(out, base);
            out.push_str(", ");
            write_expr(out, stride);
            let _ = write!(out, ", {})", lanes);
        }
        ExprKind::Broadcast { value, lanes } => {
            out.push_str("broadcast(");
            write_expr(out, value);
            let _ = write!(out, ", {})", lanes);
        }
        ExprKind::Let { name, value, body } => {
            let _ = write!(out, "let {} = ", name);
            write_expr(out, value);
            out.push_str(" in ");
            write_expr(out, body);
        }
        ExprKind::IfThenElse {
            cond,
            then_case,
            else_case,
        } => {
            out.push_str("if (");
            write_expr(out, cond);
            out.push_str(") { ");
            write_expr(out, then_case);
            out.push_str(" }");
            if let Some(e) = else_case {
                out.push_str(" else { ");
                write_expr(out, e);
                out.push_str(" }");
            }
        }
        ExprKind::For(f) => {
            let kind = match f.kind {
                ForKind::Serial => "for",
                ForKind::Parallel => "parallel for",
                ForKind::Vectorized => "vectorized for",
                ForKind::Unrolled => "unrolled for",
            };
            let _ = write!(out, "{} ({}, ", kind, f.var);
            write_expr(out, &f.min);
            out.push_str(", ");
            write_expr(out, &f.extent);
            out.push_str(") { ");
            write_expr(out, &f.body);
            out.push_str(" }");
        }
        ExprKind::Block(stmts) => {
            out.push('{');
            for (i, s) in stmts.iter().enumerate() {
                if i > 0 {
                    out.push(';');
                }
                out.push(' ');
                write_expr(out, s);
            }
            out.push_str(" }");
        }
        ExprKind::Call { name, args } => {
            out.push_str(name);
            out.push('(');
            write_list(out, args);
            out.push(')');
        }
    }
}

fn write_list(out: &mut String, exprs: &[Expr]) {
    for (i, e) in exprs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(out, e);
    }
}
