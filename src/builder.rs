//! Turning expressions into callable evaluation functions.
//!
//! The solvers evaluate the same derivative expressions many times, so each one is prepared
//! once as an [`EvalFn`]. The public entry point is
//! [`DerivativeBundle`](crate::derivatives::DerivativeBundle), whose evaluation checks the
//! input length. The default backend captures the expression in a closure that
//! walks the tree; with the `jit` feature the expression can instead be compiled to native
//! code with Cranelift.

use std::sync::Arc;

use crate::{errors::BuilderError, expr::Expr, types::EvalFn};

/// How prepared functions evaluate their expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Walk the expression tree on every call
    #[default]
    Interpreter,
    /// Compile to native code with Cranelift
    #[cfg(feature = "jit")]
    Jit,
}

/// Prepares `expr` for repeated evaluation.
///
/// The returned function reads variable `i` from `input[i]` and does not check the input
/// length; callers validate sizes once up front. A short input panics. Literal expressions,
/// which make up most entries of a sparse Hessian, become closures returning the value
/// directly for every backend.
///
/// # Errors
/// Returns a [`BuilderError`] if native compilation fails. The interpreter never fails.
pub(crate) fn build_function(expr: &Expr, backend: Backend) -> Result<EvalFn, BuilderError> {
    match expr {
        Expr::Int(v) => {
            let value = *v as f64;
            return Ok(Arc::new(move |_: &[f64]| value));
        }
        Expr::Const(v) => {
            let value = *v;
            return Ok(Arc::new(move |_: &[f64]| value));
        }
        _ => {}
    }

    match backend {
        Backend::Interpreter => {
            let expr = expr.clone();
            Ok(Arc::new(move |input: &[f64]| expr.eval_unchecked(input)))
        }
        #[cfg(feature = "jit")]
        Backend::Jit => crate::jit::compile(expr),
    }
}
