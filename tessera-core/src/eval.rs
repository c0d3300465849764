//! Reference interpreter over integer buffers.
//!
//! Executes statement trees and evaluates value expressions in the integer
//! domain, one `i64` per lane. The vectorize tests use it to check that a
//! widened loop produces the same buffer contents as the scalar original.
//! Floats and calls are out of scope.

use crate::diags;
use crate::error::Result;
use crate::ir::{BinOp, Expr, ExprKind};
use crate::{bail_eval, err_eval};
use std::collections::HashMap;

/// Interpreter state: scalar variable bindings and named `i64` buffers.
#[derive(Debug, Default)]
pub struct Interp {
    vars: HashMap<String, i64>,
    buffers: HashMap<String, Vec<i64>>,
}

impl Interp {
    pub fn new() -> Self {
        Interp::default()
    }

    pub fn set_buffer(&mut self, name: impl Into<String>, data: Vec<i64>) {
        self.buffers.insert(name.into(), data);
    }

    pub fn buffer(&self, name: &str) -> Option<&[i64]> {
        self.buffers.get(name).map(Vec::as_slice)
    }

    pub fn bind(&mut self, name: impl Into<String>, value: i64) {
        self.vars.insert(name.into(), value);
    }

    /// Execute a statement. Loops run sequentially regardless of kind; a
    /// `Vectorized` loop interpreted here yields the scalar reference
    /// semantics its widened form must reproduce.
    pub fn run(&mut self, stmt: &Expr) -> Result<()> {
        match &stmt.kind {
            ExprKind::Block(stmts) => {
                for s in stmts {
                    self.run(s)?;
                }
                Ok(())
            }
            ExprKind::For(f) => {
                let min = self.eval_scalar(&f.min)?;
                let extent = self.eval_scalar(&f.extent)?;
                let saved = self.vars.get(&f.var).copied();
                for v in min..min + extent {
                    self.vars.insert(f.var.clone(), v);
                    self.run(&f.body)?;
                }
                self.restore(&f.var, saved);
                Ok(())
            }
            ExprKind::Store {
                tensor,
                value,
                indices,
            } => {
                if indices.len() != 1 {
                    bail_eval!("store to {} must use a single index", tensor);
                }
                let values = self.eval(value)?;
                let idx = self.eval(&indices[0])?;
                let lanes = values.len().max(idx.len());
                check_lanes(&values, lanes, value)?;
                check_lanes(&idx, lanes, &indices[0])?;
                for i in 0..lanes {
                    let at = lane(&idx, i);
                    let v = lane(&values, i);
                    let buf = self
                        .buffers
                        .get_mut(tensor)
                        .ok_or_else(|| err_eval!("unknown buffer {}", tensor))?;
                    let slot = usize::try_from(at)
                        .ok()
                        .and_then(|at| buf.get_mut(at))
                        .ok_or_else(|| err_eval!("index {} out of bounds for {}", at, tensor))?;
                    *slot = v;
                }
                Ok(())
            }
            ExprKind::IfThenElse {
                cond,
                then_case,
                else_case,
            } => {
                if self.eval_scalar(cond)? != 0 {
                    self.run(then_case)
                } else if let Some(e) = else_case {
                    self.run(e)
                } else {
                    Ok(())
                }
            }
            ExprKind::Let { name, value, body } => {
                let v = self.eval_scalar(value)?;
                let saved = self.vars.get(name).copied();
                self.vars.insert(name.clone(), v);
                self.run(body)?;
                self.restore(name, saved);
                Ok(())
            }
            _ => bail_eval!("not a statement: {}", diags::format_expr(stmt)),
        }
    }

    /// Evaluate a value expression to one `i64` per lane.
    pub fn eval(&mut self, expr: &Expr) -> Result<Vec<i64>> {
        match &expr.kind {
            ExprKind::IntImm(v) => Ok(vec![*v]),
            ExprKind::FloatImm(_) => bail_eval!("float evaluation is not supported"),
            ExprKind::Var(name) => self
                .vars
                .get(name)
                .map(|v| vec![*v])
                .ok_or_else(|| err_eval!("unbound variable {}", name)),
            // Integer-to-integer width changes are value-preserving here.
            ExprKind::Cast(value) => self.eval(value),
            ExprKind::Binary { op, a, b } => {
                let va = self.eval(a)?;
                let vb = self.eval(b)?;
                let lanes = va.len().max(vb.len());
                check_lanes(&va, lanes, a)?;
                check_lanes(&vb, lanes, b)?;
                (0..lanes)
                    .map(|i| apply_binop(*op, lane(&va, i), lane(&vb, i)))
                    .collect()
            }
            ExprKind::Select {
                cond,
                true_value,
                false_value,
            } => {
                let vc = self.eval(cond)?;
                let vt = self.eval(true_value)?;
                let vf = self.eval(false_value)?;
                let lanes = vc.len().max(vt.len()).max(vf.len());
                check_lanes(&vc, lanes, cond)?;
                check_lanes(&vt, lanes, true_value)?;
                check_lanes(&vf, lanes, false_value)?;
                Ok((0..lanes)
                    .map(|i| {
                        if lane(&vc, i) != 0 {
                            lane(&vt, i)
                        } else {
                            lane(&vf, i)
                        }
                    })
                    .collect())
            }
            ExprKind::Load { tensor, indices } => {
                if indices.len() != 1 {
                    bail_eval!("load from {} must use a single index", tensor);
                }
                let idx = self.eval(&indices[0])?;
                let buf = self
                    .buffers
                    .get(tensor)
                    .ok_or_else(|| err_eval!("unknown buffer {}", tensor))?;
                idx.iter()
                    .map(|&at| {
                        usize::try_from(at)
                            .ok()
                            .and_then(|at| buf.get(at))
                            .copied()
                            .ok_or_else(|| err_eval!("index {} out of bounds for {}", at, tensor))
                    })
                    .collect()
            }
            ExprKind::Ramp {
                base,
                stride,
                lanes,
            } => {
                let base = self.eval_scalar(base)?;
                let stride = self.eval_scalar(stride)?;
                Ok((0..*lanes as i64).map(|i| base + i * stride).collect())
            }
            ExprKind::Broadcast { value, lanes } => {
                let v = self.eval_scalar(value)?;
                Ok(vec![v; *lanes as usize])
            }
            ExprKind::Let { name, value, body } => {
                let v = self.eval_scalar(value)?;
                let saved = self.vars.get(name).copied();
                self.vars.insert(name.clone(), v);
                let result = self.eval(body);
                self.restore(name, saved);
                result
            }
            _ => bail_eval!("cannot evaluate {}", diags::format_expr(expr)),
        }
    }

    fn eval_scalar(&mut self, expr: &Expr) -> Result<i64> {
        let v = self.eval(expr)?;
        if v.len() != 1 {
            bail_eval!(
                "expected a scalar, found {} lanes in {}",
                v.len(),
                diags::format_expr(expr)
            );
        }
        Ok(v[0])
    }

    fn restore(&mut self, name: &str, saved: Option<i64>) {
        match saved {
            Some(v) => self.vars.insert(name.to_string(), v),
            None => self.vars.remove(name),
        };
    }
}

fn apply_binop(op: BinOp, l: i64, r: i64) -> Result<i64> {
    let v = match op {
        BinOp::Add => l.wrapping_add(r),
        BinOp::Sub => l.wrapping_sub(r),
        BinOp::Mul => l.wrapping_mul(r),
        BinOp::Div => {
            if r == 0 {
                bail_eval!("division by zero");
            }
            l / r
        }
        BinOp::Mod => {
            if r == 0 {
                bail_eval!("modulo by zero");
            }
            l % r
        }
        BinOp::Min => l.min(r),
        BinOp::Max => l.max(r),
        BinOp::Eq => (l == r) as i64,
        BinOp::Ne => (l != r) as i64,
        BinOp::Lt => (l < r) as i64,
        BinOp::Le => (l <= r) as i64,
        BinOp::Gt => (l > r) as i64,
        BinOp::Ge => (l >= r) as i64,
        BinOp::And => (l != 0 && r != 0) as i64,
        BinOp::Or => (l != 0 || r != 0) as i64,
    };
    Ok(v)
}

/// Lane access with scalar broadcasting.
fn lane(values: &[i64], i: usize) -> i64 {
    if values.len() == 1 {
        values[0]
    } else {
        values[i]
    }
}

fn check_lanes(values: &[i64], lanes: usize, expr: &Expr) -> Result<()> {
    if values.len() != lanes && values.len() != 1 {
        bail_eval!(
            "lane mismatch: {} has {} lanes, expected 1 or {}",
            diags::format_expr(expr),
            values.len(),
            lanes
        );
    }
    Ok(())
}
