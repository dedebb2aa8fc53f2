//! Symbolic differentiation of expression trees with a Levenberg-Marquardt least-squares solver.
//!
//! This crate represents scalar formulas as immutable expression trees, differentiates them
//! symbolically with respect to indexed variables, simplifies the results with a single
//! bottom-up rewrite pass and evaluates them numerically. The least-squares solvers build
//! first and second derivative expressions of an objective once and then evaluate them at
//! every iteration, either to fit parameters to data or to solve systems of equations.
//!
//! # Features
//!
//! - Expression trees with structural sharing (`Arc` children)
//! - Partial derivatives of any order through repeated `pdiff`
//! - Exact-identity simplification that keeps derivative trees small
//! - Quaternion algebra over expressions
//! - Parsing of formula strings through [evalexpr](https://github.com/ISibboI/evalexpr)
//! - Optional native compilation with Cranelift (`jit` feature)
//!
//! # Example
//!
//! ```rust
//! use exprfit::prelude::*;
//!
//! let x = Expr::var(0, "x");
//! let f = sin(&x) * &x;
//!
//! // d/dx (sin(x) * x) = cos(x) * x + sin(x)
//! let df = f.pdiff_index(0);
//! assert_eq!(df.to_string(), "cos(x) * x + sin(x)");
//!
//! let value = df.eval(&[0.5]).unwrap();
//! assert!((value - (0.5f64.cos() * 0.5 + 0.5f64.sin())).abs() < 1e-12);
//! ```

pub use expr::{cos, sin, sqrt, tan, Expr, Func, VarRef};
pub use least_squares::{LeastSquares, LeastSquaresSystem};
pub use solver::{LmOptions, LmReport};

pub mod prelude {
    pub use crate::args::{pack_args, Arg};
    pub use crate::builder::Backend;
    pub use crate::convert::parse_with_symbols;
    pub use crate::derivatives::DerivativeBundle;
    pub use crate::diff::pdiff;
    pub use crate::expr::{cos, sin, sqrt, tan, Expr, Func, VarRef};
    pub use crate::least_squares::{LeastSquares, LeastSquaresSystem};
    pub use crate::quaternion::Quaternion;
    pub use crate::solver::{LmOptions, LmReport};
}

/// Flattening of scalar and quaternion arguments into evaluation inputs
pub mod args;
/// Input containers accepted by evaluation and the solvers
pub mod backends {
    pub mod vector;
}
/// Turning expressions into callable evaluation functions
pub mod builder;
/// Conversion from parsed formula strings to expression trees
pub mod convert;
/// Precomputed first and second derivative expressions of an objective
pub mod derivatives;
/// Symbolic partial differentiation
pub mod diff;
/// Textual form of expressions
pub mod display;
/// Error types for the various failure modes
pub mod errors;
/// Expression tree representation and evaluation
pub mod expr;
/// Native compilation of expressions with Cranelift
#[cfg(feature = "jit")]
pub mod jit;
/// Curve fitting and equation-system solvers
pub mod least_squares;
/// Quaternions built from four scalar expressions
pub mod quaternion;
/// Algebraic simplification
pub mod simplify;
/// Damped Gauss-Newton iteration shared by the solvers
pub mod solver;
/// Shared function type aliases
mod types;
