//! Error types for the exprfit crate.
//!
//! This module defines the error types that can occur while parsing formulas, evaluating
//! expressions, compiling them and running the least-squares solvers:
//!
//! - `ConvertError`: Errors during conversion from the evalexpr AST to an `Expr`
//! - `ExprError`: Parsing and evaluation errors of single expressions
//! - `BuilderError`: Errors during native compilation (only produced with the `jit` feature)
//! - `SolverError`: Size mismatches and numerical failures of the solvers
//!
//! Building, simplifying and differentiating expressions cannot fail. Division by zero during
//! evaluation follows IEEE semantics and is not an error either.

use evalexpr::{DefaultNumericTypes, EvalexprError};
use thiserror::Error;

/// Errors that can occur during conversion from evalexpr AST to our expression tree.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Error when an exponent is not an integer literal of supported magnitude
    #[error("Could not convert exponent in Exp operator: {0}")]
    ExpOperator(String),
    /// Error when encountering an operator that is not supported by our implementation
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),
    /// Error when encountering a function that is not supported by our implementation
    #[error("Unsupported function: {0}")]
    UnsupportedFunction(String),
    /// Error when a node does not have the number of children its operator requires
    #[error("Unexpected number of operands: {0}")]
    Arity(String),
    /// Error when a constant value is not numeric
    #[error("Expected numeric constant: {0}")]
    ConstOperator(String),
    /// Error when a variable is not found in the variable map
    #[error("Variable not found: {0}")]
    VariableNotFound(String),
}

/// Errors that can occur when parsing or evaluating a single expression.
#[derive(Error, Debug)]
pub enum ExprError {
    /// Error when parsing the expression string with evalexpr
    #[error("Failed to build Evalexpr AST")]
    Parse(#[from] EvalexprError<DefaultNumericTypes>),
    /// Error when converting the evalexpr AST into an expression tree
    #[error("Failed to build expression tree")]
    Convert(#[from] ConvertError),
    /// Error when the input does not provide a value for every referenced variable
    #[error("Invalid input length: expected at least {expected}, got {got}")]
    InvalidInputLength { expected: usize, got: usize },
}

/// Errors that can occur during native compilation of expressions.
///
/// The interpreter backend never fails; these are only produced by the `jit` backend.
#[derive(Error, Debug)]
pub enum BuilderError {
    /// Error when the target machine architecture is not supported
    #[error("host machine is not supported: {0}")]
    HostMachineNotSupported(String),
    /// Error during Cranelift code generation or flag configuration
    #[error("codegen error: {0}")]
    Codegen(String),
    /// Error in the Cranelift JIT module
    #[error("module error: {0}")]
    Module(String),
    /// Error when declaring or defining the compiled function
    #[error("function error: {0}")]
    Function(String),
}

/// Errors that can occur when setting up or running the least-squares solvers.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Error when compiling derivative expressions
    #[error("Failed to build evaluation function")]
    Builder(#[from] BuilderError),
    /// Error when the parameter vector does not match the declared size
    #[error("Invalid parameter length: expected {expected}, got {got}")]
    InvalidParameterLength { expected: usize, got: usize },
    /// Error when a data sample does not match the declared size
    #[error("Invalid length of sample {index}: expected {expected}, got {got}")]
    InvalidSampleLength {
        index: usize,
        expected: usize,
        got: usize,
    },
    /// Error when an objective references variables beyond the declared slots
    #[error("Expression references {arity} variables but only {available} slots are declared")]
    ExpressionArity { arity: usize, available: usize },
    /// Error when there is nothing to minimize
    #[error("No residuals: push at least one equation or supply at least one sample")]
    NoResiduals,
    /// Error when the initial damping or its scale factor cannot make progress
    #[error("Invalid damping: lambda must be positive and scale greater than 1, got lambda = {lambda}, scale = {scale}")]
    InvalidDamping { lambda: f64, scale: f64 },
    /// Error when the damped step was rejected too many times in a row
    #[error("No acceptable step after {attempts} damping attempts (lambda = {lambda:e})")]
    DampingExhausted { attempts: usize, lambda: f64 },
    /// Error when no damping tried within one iteration gave a positive definite matrix
    #[error("Damped curvature matrix could not be factorized in {attempts} attempts (lambda = {lambda:e})")]
    Factorization { attempts: usize, lambda: f64 },
}
