//! Expression module for representing mathematical expressions.
//!
//! This module defines the core expression types used throughout the crate:
//!
//! - `Expr`: An enum representing the different kinds of expression nodes
//! - `VarRef`: The identity of a variable, an index into the evaluation input
//! - `Func`: The elementary functions that can be applied to an expression
//!
//! Expressions are immutable trees whose children are shared through `Arc<Expr>`, so copying
//! an expression is cheap and derivative trees reuse subtrees of the expression they were
//! built from. Expressions are built either by constructing the enum variants directly or
//! through the overloaded arithmetic operators and the free functions [`sqrt`], [`sin`],
//! [`cos`] and [`tan`]:
//!
//! ```rust
//! use exprfit::prelude::*;
//!
//! let x = Expr::var(0, "x");
//! let y = Expr::var(1, "y");
//! let f = sqrt(&x * &x + &y * &y) / 2.0;
//!
//! assert_eq!(f.eval(&[3.0, 4.0]).unwrap(), 2.5);
//! assert_eq!(f.arity(), 2);
//! ```
//!
//! # Literals
//! Integer literals (`Int`) and floating point literals (`Const`) are kept apart. Only the
//! integer literals 0 and 1 take part in simplification, so `x * 1` collapses while
//! `x * 1.0` is kept as written.

use std::hash::{Hash, Hasher};
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

use crate::backends::vector::Vector;
use crate::errors::ExprError;

/// Reference to a variable in an expression.
///
/// A variable is identified by its index into the evaluation input. The optional name is
/// used for printing only; two references with the same index are the same variable
/// whatever their names.
#[derive(Debug, Clone, Eq)]
pub struct VarRef {
    pub index: u32,
    pub name: Option<String>,
}

impl VarRef {
    /// Creates a named variable reference.
    pub fn new(index: u32, name: impl Into<String>) -> Self {
        VarRef {
            index,
            name: Some(name.into()),
        }
    }

    /// Creates a placeholder without a name, printed as `<index>`.
    pub fn unnamed(index: u32) -> Self {
        VarRef { index, name: None }
    }
}

impl PartialEq for VarRef {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Hash for VarRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

/// Elementary functions supported in expressions.
///
/// Arguments of the trigonometric functions are in radians.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func {
    Sqrt,
    Sin,
    Cos,
    Tan,
}

impl Func {
    /// Applies the function to a number.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Func::Sqrt => x.sqrt(),
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tan => x.tan(),
        }
    }

    /// The name used when printing and parsing.
    pub fn name(self) -> &'static str {
        match self {
            Func::Sqrt => "sqrt",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
        }
    }

    /// Looks up a function by its name.
    pub fn from_name(name: &str) -> Option<Func> {
        match name {
            "sqrt" => Some(Func::Sqrt),
            "sin" => Some(Func::Sin),
            "cos" => Some(Func::Cos),
            "tan" => Some(Func::Tan),
            _ => None,
        }
    }
}

/// An expression tree node.
///
/// Nodes never change after construction. Equality is structural, with variables compared
/// by index.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// An integer literal
    Int(i64),
    /// A floating point literal
    Const(f64),
    /// A reference to a variable
    Var(VarRef),
    /// Negation of an expression
    Neg(Arc<Expr>),
    /// Addition of two expressions
    Add(Arc<Expr>, Arc<Expr>),
    /// Subtraction of two expressions
    Sub(Arc<Expr>, Arc<Expr>),
    /// Multiplication of two expressions
    Mul(Arc<Expr>, Arc<Expr>),
    /// Division of two expressions
    Div(Arc<Expr>, Arc<Expr>),
    /// Application of an elementary function
    Call(Func, Arc<Expr>),
}

impl Expr {
    /// Creates a named variable with the given input index.
    pub fn var(index: u32, name: impl Into<String>) -> Expr {
        Expr::Var(VarRef::new(index, name))
    }

    /// Creates an unnamed placeholder with the given input index.
    pub fn placeholder(index: u32) -> Expr {
        Expr::Var(VarRef::unnamed(index))
    }

    /// Returns true if this node is the integer literal `value`.
    ///
    /// Floating point literals never match, even when numerically equal.
    pub fn is_int(&self, value: i64) -> bool {
        matches!(self, Expr::Int(v) if *v == value)
    }

    /// Returns true for literals and variables.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Expr::Int(_) | Expr::Const(_) | Expr::Var(_))
    }

    /// Number of input values needed to evaluate the expression.
    ///
    /// This is one more than the highest variable index referenced, or zero for expressions
    /// without variables.
    pub fn arity(&self) -> usize {
        match self {
            Expr::Int(_) | Expr::Const(_) => 0,
            Expr::Var(v) => v.index as usize + 1,
            Expr::Neg(e) | Expr::Call(_, e) => e.arity(),
            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) => {
                l.arity().max(r.arity())
            }
        }
    }

    /// Number of nodes in the tree, counting shared subtrees once per occurrence.
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Int(_) | Expr::Const(_) | Expr::Var(_) => 1,
            Expr::Neg(e) | Expr::Call(_, e) => 1 + e.node_count(),
            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) => {
                1 + l.node_count() + r.node_count()
            }
        }
    }

    /// Evaluates the expression with variable `i` taking the value `values[i]`.
    ///
    /// Division by zero and functions outside their domain follow IEEE semantics and
    /// produce infinities or NaN.
    ///
    /// # Errors
    /// Returns [`ExprError::InvalidInputLength`] if `values` is shorter than
    /// [`arity`](Expr::arity).
    pub fn eval<V: Vector + ?Sized>(&self, values: &V) -> Result<f64, ExprError> {
        let values = values.as_slice();
        let expected = self.arity();
        if values.len() < expected {
            return Err(ExprError::InvalidInputLength {
                expected,
                got: values.len(),
            });
        }
        Ok(self.eval_unchecked(values))
    }

    /// Evaluates the expression without checking the input length.
    ///
    /// Callers must make sure `values` covers [`arity`](Expr::arity); a missing value panics
    /// on the out-of-bounds index.
    pub(crate) fn eval_unchecked(&self, values: &[f64]) -> f64 {
        match self {
            Expr::Int(v) => *v as f64,
            Expr::Const(v) => *v,
            Expr::Var(v) => values[v.index as usize],
            Expr::Neg(e) => -e.eval_unchecked(values),
            Expr::Add(l, r) => l.eval_unchecked(values) + r.eval_unchecked(values),
            Expr::Sub(l, r) => l.eval_unchecked(values) - r.eval_unchecked(values),
            Expr::Mul(l, r) => l.eval_unchecked(values) * r.eval_unchecked(values),
            Expr::Div(l, r) => l.eval_unchecked(values) / r.eval_unchecked(values),
            Expr::Call(func, e) => func.apply(e.eval_unchecked(values)),
        }
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::Int(value as i64)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::Int(value)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Const(value)
    }
}

impl From<VarRef> for Expr {
    fn from(value: VarRef) -> Self {
        Expr::Var(value)
    }
}

impl From<&VarRef> for Expr {
    fn from(value: &VarRef) -> Self {
        Expr::Var(value.clone())
    }
}

impl From<&Expr> for Expr {
    fn from(value: &Expr) -> Self {
        value.clone()
    }
}

/// Square root of an expression.
pub fn sqrt(arg: impl Into<Expr>) -> Expr {
    Expr::Call(Func::Sqrt, Arc::new(arg.into()))
}

/// Sine of an expression.
pub fn sin(arg: impl Into<Expr>) -> Expr {
    Expr::Call(Func::Sin, Arc::new(arg.into()))
}

/// Cosine of an expression.
pub fn cos(arg: impl Into<Expr>) -> Expr {
    Expr::Call(Func::Cos, Arc::new(arg.into()))
}

/// Tangent of an expression.
pub fn tan(arg: impl Into<Expr>) -> Expr {
    Expr::Call(Func::Tan, Arc::new(arg.into()))
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $variant:ident) => {
        impl<R: Into<Expr>> $trait<R> for Expr {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                Expr::$variant(Arc::new(self), Arc::new(rhs.into()))
            }
        }

        impl<R: Into<Expr>> $trait<R> for &Expr {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                Expr::$variant(Arc::new(self.clone()), Arc::new(rhs.into()))
            }
        }

        impl_binary_op!(@literal $trait, $method, $variant, i32);
        impl_binary_op!(@literal $trait, $method, $variant, i64);
        impl_binary_op!(@literal $trait, $method, $variant, f64);
    };
    (@literal $trait:ident, $method:ident, $variant:ident, $lit:ty) => {
        impl $trait<Expr> for $lit {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::$variant(Arc::new(Expr::from(self)), Arc::new(rhs))
            }
        }

        impl $trait<&Expr> for $lit {
            type Output = Expr;

            fn $method(self, rhs: &Expr) -> Expr {
                Expr::$variant(Arc::new(Expr::from(self)), Arc::new(rhs.clone()))
            }
        }
    };
}

impl_binary_op!(Add, add, Add);
impl_binary_op!(Sub, sub, Sub);
impl_binary_op!(Mul, mul, Mul);
impl_binary_op!(Div, div, Div);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Arc::new(self))
    }
}

impl Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Arc::new(self.clone()))
    }
}
