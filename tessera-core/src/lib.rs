//! Core IR and passes for the tessera tensor compiler.
//!
//! The crate centers on the loop vectorization pass
//! ([`vectorize::vectorize_loops`]): loop discovery, splitting by a vector
//! factor, substitution of the loop variable by the identity ramp, algebraic
//! widening, and scalarization fallback. The tensor-compute declaration
//! surface ([`compute::compute`]) builds the tensors whose loop nests the
//! pass ultimately consumes.

pub mod compute;
pub mod diags;
pub mod error;
pub mod eval;
pub mod ir;
pub mod simplify;
pub mod substitute;
pub mod target;
pub mod vectorize;

#[cfg(test)]
mod simplify_tests;
#[cfg(test)]
mod vectorize_tests;

use indexmap::IndexMap;
use std::collections::HashMap;

pub use error::{CompileError, Result};
pub use target::Target;

/// Counter registry key: number of vectorized for-loops processed by the
/// driver, including loops whose split later declined.
pub const VECTORIZED_FORLOOP_COUNT: &str = "vectorized_forloop_count";

/// Per-compilation shared state: fresh-name generation and diagnostic
/// counters.
///
/// Passes take the context as an explicit `&mut` parameter. It is not
/// thread-safe; concurrent passes over independent IR roots need their own
/// context each.
#[derive(Debug, Default)]
pub struct Context {
    /// Next suffix per name prefix.
    names: HashMap<String, u32>,
    /// Diagnostic counters, in first-bump order for deterministic dumps.
    counters: IndexMap<String, u64>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// A fresh variable name: `prefix0`, `prefix1`, … per prefix.
    pub fn fresh_name(&mut self, prefix: &str) -> String {
        let next = self.names.entry(prefix.to_string()).or_insert(0);
        let name = format!("{}{}", prefix, next);
        *next += 1;
        name
    }

    /// Increment a diagnostic counter, creating it at zero on first use.
    pub fn bump(&mut self, counter: &str) -> u64 {
        let slot = self.counters.entry(counter.to_string()).or_insert(0);
        *slot += 1;
        *slot
    }

    /// Current value of a counter; zero if it was never bumped.
    pub fn counter(&self, counter: &str) -> u64 {
        self.counters.get(counter).copied().unwrap_or(0)
    }

    /// All counters in first-bump order.
    pub fn counters(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counters.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
