//! Tensor-compute declarations.
//!
//! [`compute`] turns an output shape and an indexing function into a
//! [`Tensor`]: the shape is simplified, default axes are generated for each
//! dimension, reduce axes extend the iteration domain, and the indexing
//! function is applied to the axis variables to produce the stored body.
//! Downstream loop synthesis turns the domain and body into the loop nests
//! the vectorizer consumes.

use crate::bail_compute;
use crate::diags;
use crate::error::Result;
use crate::ir::{Expr, Type};
use crate::simplify::simplify;
use crate::Context;

/// An iteration axis with half-open bounds `[lower_bound, upper_bound)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub name: String,
    pub lower_bound: Expr,
    pub upper_bound: Expr,
}

impl Axis {
    pub fn new(name: impl Into<String>, lower_bound: Expr, upper_bound: Expr) -> Self {
        Axis {
            name: name.into(),
            lower_bound,
            upper_bound,
        }
    }

    /// An axis over `[0, upper_bound)`, the shape of every generated axis
    /// and of well-formed reduce axes.
    pub fn from_extent(name: impl Into<String>, upper_bound: Expr) -> Self {
        Axis::new(name, Expr::int(0), upper_bound)
    }

    /// The axis as an expression: a scalar `i32` variable.
    pub fn to_expr(&self) -> Expr {
        Expr::var(self.name.clone(), Type::i32())
    }
}

/// A declared tensor computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub name: String,
    /// Output buffer shape, simplified.
    pub shape: Vec<Expr>,
    /// Extents of all loop axes: the shape followed by the reduce-axis
    /// upper bounds.
    pub domain: Vec<Expr>,
    /// Output axes followed by reduce axes.
    pub axes: Vec<Axis>,
    /// The indexing function applied to the axis variables.
    pub body: Expr,
}

/// An indexing function over a fixed or variadic number of axes.
///
/// The fixed-arity implementations are sugar over the variadic form and
/// assert that the dimension count matches the closure's arity. The marker
/// parameter keeps the blanket implementations for different closure shapes
/// from overlapping.
pub trait IndexFn<Marker> {
    fn apply(self, axes: &[Expr]) -> Expr;
}

impl<F: FnOnce(&[Expr]) -> Expr> IndexFn<Vec<Expr>> for F {
    fn apply(self, axes: &[Expr]) -> Expr {
        self(axes)
    }
}

impl<F: FnOnce(Expr) -> Expr> IndexFn<(Expr,)> for F {
    fn apply(self, axes: &[Expr]) -> Expr {
        assert_eq!(axes.len(), 1, "indexing function takes 1 axis");
        self(axes[0].clone())
    }
}

impl<F: FnOnce(Expr, Expr) -> Expr> IndexFn<(Expr, Expr)> for F {
    fn apply(self, axes: &[Expr]) -> Expr {
        assert_eq!(axes.len(), 2, "indexing function takes 2 axes");
        self(axes[0].clone(), axes[1].clone())
    }
}

impl<F: FnOnce(Expr, Expr, Expr) -> Expr> IndexFn<(Expr, Expr, Expr)> for F {
    fn apply(self, axes: &[Expr]) -> Expr {
        assert_eq!(axes.len(), 3, "indexing function takes 3 axes");
        self(axes[0].clone(), axes[1].clone(), axes[2].clone())
    }
}

impl<F: FnOnce(Expr, Expr, Expr, Expr) -> Expr> IndexFn<(Expr, Expr, Expr, Expr)> for F {
    fn apply(self, axes: &[Expr]) -> Expr {
        assert_eq!(axes.len(), 4, "indexing function takes 4 axes");
        self(
            axes[0].clone(),
            axes[1].clone(),
            axes[2].clone(),
            axes[3].clone(),
        )
    }
}

impl<F: FnOnce(Expr, Expr, Expr, Expr, Expr) -> Expr> IndexFn<(Expr, Expr, Expr, Expr, Expr)>
    for F
{
    fn apply(self, axes: &[Expr]) -> Expr {
        assert_eq!(axes.len(), 5, "indexing function takes 5 axes");
        self(
            axes[0].clone(),
            axes[1].clone(),
            axes[2].clone(),
            axes[3].clone(),
            axes[4].clone(),
        )
    }
}

/// Declare a tensor of shape `dims` whose element at the generated axes is
/// `f(axes)`. Reduce axes must start at 0 and are appended to the iteration
/// domain. An empty `name` draws a fresh one from the context.
pub fn compute<M>(
    dims: &[Expr],
    f: impl IndexFn<M>,
    name: &str,
    reduce_axis: Vec<Axis>,
    ctx: &mut Context,
) -> Result<Tensor> {
    let shape: Vec<Expr> = dims
        .iter()
        .map(|dim| {
            let mut d = dim.clone();
            simplify(&mut d);
            d
        })
        .collect();

    let mut axes: Vec<Axis> = shape
        .iter()
        .enumerate()
        .map(|(i, dim)| Axis::from_extent(default_axis_name(i), dim.clone()))
        .collect();
    let axis_vars: Vec<Expr> = axes.iter().map(Axis::to_expr).collect();
    let body = f.apply(&axis_vars);

    let mut domain = shape.clone();
    for axis in &reduce_axis {
        if axis.lower_bound.as_int() != Some(0) {
            bail_compute!(
                "reduce axis {} must start at 0, found {}",
                axis.name,
                diags::format_expr(&axis.lower_bound)
            );
        }
        domain.push(axis.upper_bound.clone());
    }
    axes.extend(reduce_axis);

    let name = if name.is_empty() {
        ctx.fresh_name("tensor")
    } else {
        name.to_string()
    };

    Ok(Tensor {
        name,
        shape,
        domain,
        axes,
        body,
    })
}

/// Default axis names: `i`, `j`, `k`, `l`, `m`, then `axis5`, `axis6`, …
fn default_axis_name(i: usize) -> String {
    const NAMES: [&str; 5] = ["i", "j", "k", "l", "m"];
    match NAMES.get(i) {
        Some(n) => (*n).to_string(),
        None => format!("axis{}", i),
    }
}
