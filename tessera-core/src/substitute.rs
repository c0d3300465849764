//! Free-variable substitution.
//!
//! Replaces occurrences of a named variable in a subtree by a replacement
//! expression. The loop splitter uses this to rewrite the original induction
//! variable as `outer * factor + inner`, and scalarization uses it to redirect
//! the vectorized variable to the fresh serial index.
//!
//! Name shadowing is not tracked: every occurrence of the name is replaced.
//! When the replacement is itself a variable, a for-loop whose induction
//! variable carries the substituted name is renamed along with its uses.

use crate::ir::{Expr, ExprKind};

/// Substitute `replacement` for every occurrence of `Var(var)` in `expr`.
pub fn substitute(expr: &mut Expr, var: &str, replacement: &Expr) {
    match &mut expr.kind {
        ExprKind::Var(name) => {
            if name == var {
                *expr = replacement.clone();
            }
        }
        ExprKind::IntImm(_) | ExprKind::FloatImm(_) => {}
        ExprKind::Cast(value) => substitute(value, var, replacement),
        ExprKind::Binary { a, b, .. } => {
            substitute(a, var, replacement);
            substitute(b, var, replacement);
        }
        ExprKind::Select {
            cond,
            true_value,
            false_value,
        } => {
            substitute(cond, var, replacement);
            substitute(true_value, var, replacement);
            substitute(false_value, var, replacement);
        }
        ExprKind::Load { indices, .. } => {
            for index in indices {
                substitute(index, var, replacement);
            }
        }
        ExprKind::Store { value, indices, .. } => {
            substitute(value, var, replacement);
            for index in indices {
                substitute(index, var, replacement);
            }
        }
        ExprKind::Ramp { base, stride, .. } => {
            substitute(base, var, replacement);
            substitute(stride, var, replacement);
        }
        ExprKind::Broadcast { value, .. } => substitute(value, var, replacement),
        ExprKind::Let { value, body, .. } => {
            substitute(value, var, replacement);
            substitute(body, var, replacement);
        }
        ExprKind::IfThenElse {
            cond,
            then_case,
            else_case,
        } => {
            substitute(cond, var, replacement);
            substitute(then_case, var, replacement);
            if let Some(e) = else_case {
                substitute(e, var, replacement);
            }
        }
        ExprKind::For(f) => {
            substitute(&mut f.min, var, replacement);
            substitute(&mut f.extent, var, replacement);
            substitute(&mut f.body, var, replacement);
            if f.var == var {
                if let ExprKind::Var(new_name) = &replacement.kind {
                    f.var = new_name.clone();
                }
            }
        }
        ExprKind::Block(stmts) => {
            for s in stmts {
                substitute(s, var, replacement);
            }
        }
        ExprKind::Call { args, .. } => {
            for a in args {
                substitute(a, var, replacement);
            }
        }
    }
}
