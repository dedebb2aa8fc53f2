use std::sync::Arc;

/// Type alias for a prepared function that evaluates a single expression.
///
/// This represents a function that:
/// - Takes a slice of input values indexed by variable index
/// - Returns a single f64 result from evaluating the expression
/// - Is both Send and Sync so solvers can be shared between threads
///
/// Depending on the [`Backend`](crate::builder::Backend) it either walks the expression
/// tree or calls natively compiled code.
pub(crate) type EvalFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;
