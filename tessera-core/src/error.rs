//! Error types for the tessera compiler core.
//!
//! Each pass family gets an `err_<family>!` constructor macro and a
//! `bail_<family>!` early-return macro; passes build messages with the
//! formatters from [`crate::diags`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// A fatal driver/splitter check failed; the pass is aborted.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A subtree could not be lifted to the requested lane width.
    #[error("vectorization error: {0}")]
    Vectorize(String),

    /// The tensor-compute surface rejected its inputs.
    #[error("compute error: {0}")]
    Compute(String),

    /// The reference interpreter hit an unsupported or invalid construct.
    #[error("evaluation error: {0}")]
    Eval(String),
}

pub type Result<T> = std::result::Result<T, CompileError>;

#[macro_export]
macro_rules! err_precondition {
    ($($arg:tt)*) => {
        $crate::error::CompileError::Precondition(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! bail_precondition {
    ($($arg:tt)*) => {
        return Err($crate::err_precondition!($($arg)*))
    };
}

#[macro_export]
macro_rules! err_vectorize {
    ($($arg:tt)*) => {
        $crate::error::CompileError::Vectorize(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! bail_vectorize {
    ($($arg:tt)*) => {
        return Err($crate::err_vectorize!($($arg)*))
    };
}

#[macro_export]
macro_rules! err_compute {
    ($($arg:tt)*) => {
        $crate::error::CompileError::Compute(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! bail_compute {
    ($($arg:tt)*) => {
        return Err($crate::err_compute!($($arg)*))
    };
}

#[macro_export]
macro_rules! err_eval {
    ($($arg:tt)*) => {
        $crate::error::CompileError::Eval(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! bail_eval {
    ($($arg:tt)*) => {
        return Err($crate::err_eval!($($arg)*))
    };
}
