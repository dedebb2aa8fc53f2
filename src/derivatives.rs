//! Precomputed derivatives of an objective.
//!
//! A [`DerivativeBundle`] holds an objective `C0` in `n` parameters, its first partial
//! derivatives `C1[j] = ∂C0/∂x_j` and its second partial derivatives
//! `C2[i][j] = ∂/∂x_i (∂C0/∂x_j)`, each prepared once as an evaluation function. The
//! second derivatives are stored for `i <= j` only and looked up symmetrically, so a bundle
//! over `n` parameters builds `n (n + 1) / 2` of them.
//!
//! Parameters occupy the first `n` slots of the evaluation input. Any further slots are
//! treated as constants (data values or auxiliary inputs) and are never differentiated.

use std::fmt;

use colored::Colorize;
use itertools::Itertools;
use log::debug;

use crate::{
    backends::vector::Vector,
    builder::{build_function, Backend},
    errors::{BuilderError, ExprError},
    expr::Expr,
    types::EvalFn,
};

/// An objective together with its first and second partial derivatives.
#[derive(Clone)]
pub struct DerivativeBundle {
    n_params: usize,
    c0: Expr,
    c1: Vec<Expr>,
    c2: Vec<Expr>,
    f0: EvalFn,
    f1: Vec<EvalFn>,
    f2: Vec<EvalFn>,
}

impl DerivativeBundle {
    /// Builds the derivatives of `c0` with respect to its first `n_params` variables.
    ///
    /// # Arguments
    /// * `c0` - The objective expression
    /// * `n_params` - Number of leading variables to differentiate with respect to
    ///
    /// # Errors
    /// Returns a [`BuilderError`] if an evaluation function cannot be prepared.
    pub fn new(c0: Expr, n_params: usize) -> Result<Self, BuilderError> {
        Self::with_backend(c0, n_params, Backend::default())
    }

    /// Builds the derivatives of `c0` with evaluation functions prepared by `backend`.
    ///
    /// # Errors
    /// Returns a [`BuilderError`] if native compilation fails.
    pub fn with_backend(c0: Expr, n_params: usize, backend: Backend) -> Result<Self, BuilderError> {
        let c1: Vec<Expr> = (0..n_params)
            .map(|j| c0.pdiff_index(j as u32))
            .collect();

        let c2: Vec<Expr> = (0..n_params)
            .flat_map(|i| (i..n_params).map(move |j| (i, j)))
            .map(|(i, j)| c1[j].pdiff_index(i as u32))
            .collect();

        debug!(
            "built derivative bundle over {} parameters: C0 {} nodes, C1 {} nodes, C2 {} nodes ({} nonzero)",
            n_params,
            c0.node_count(),
            c1.iter().map(Expr::node_count).sum::<usize>(),
            c2.iter().map(Expr::node_count).sum::<usize>(),
            c2.iter().filter(|e| !e.is_int(0)).count(),
        );

        let f0 = build_function(&c0, backend)?;
        let f1 = c1
            .iter()
            .map(|e| build_function(e, backend))
            .collect::<Result<Vec<_>, _>>()?;
        let f2 = c2
            .iter()
            .map(|e| build_function(e, backend))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DerivativeBundle {
            n_params,
            c0,
            c1,
            c2,
            f0,
            f1,
            f2,
        })
    }

    /// Number of parameters the derivatives are taken with respect to.
    pub fn n_params(&self) -> usize {
        self.n_params
    }

    /// Number of input values the objective needs.
    pub fn arity(&self) -> usize {
        self.c0.arity()
    }

    /// The objective expression.
    pub fn c0(&self) -> &Expr {
        &self.c0
    }

    /// First derivative with respect to parameter `j`.
    ///
    /// # Panics
    /// Panics if `j >= n_params`.
    pub fn c1(&self, j: usize) -> &Expr {
        &self.c1[j]
    }

    /// Second derivative with respect to parameters `i` and `j`, in either order.
    ///
    /// # Panics
    /// Panics if `i` or `j` is not below `n_params`.
    pub fn c2(&self, i: usize, j: usize) -> &Expr {
        &self.c2[self.packed_index(i, j)]
    }

    /// Evaluates the objective at `input`.
    ///
    /// # Errors
    /// Returns [`ExprError::InvalidInputLength`] if `input` is shorter than
    /// [`arity`](Self::arity).
    pub fn eval_c0<V: Vector + ?Sized>(&self, input: &V) -> Result<f64, ExprError> {
        let input = self.checked(input)?;
        Ok(self.eval_c0_unchecked(input))
    }

    /// Evaluates the first derivative with respect to parameter `j` at `input`.
    ///
    /// # Errors
    /// Returns [`ExprError::InvalidInputLength`] if `input` is shorter than
    /// [`arity`](Self::arity).
    pub fn eval_c1<V: Vector + ?Sized>(&self, j: usize, input: &V) -> Result<f64, ExprError> {
        let input = self.checked(input)?;
        Ok(self.eval_c1_unchecked(j, input))
    }

    /// Evaluates the second derivative with respect to parameters `i` and `j` at `input`.
    ///
    /// # Errors
    /// Returns [`ExprError::InvalidInputLength`] if `input` is shorter than
    /// [`arity`](Self::arity).
    pub fn eval_c2<V: Vector + ?Sized>(
        &self,
        i: usize,
        j: usize,
        input: &V,
    ) -> Result<f64, ExprError> {
        let input = self.checked(input)?;
        Ok(self.eval_c2_unchecked(i, j, input))
    }

    /// Callers must pass an input covering [`arity`](Self::arity).
    pub(crate) fn eval_c0_unchecked(&self, input: &[f64]) -> f64 {
        (self.f0)(input)
    }

    pub(crate) fn eval_c1_unchecked(&self, j: usize, input: &[f64]) -> f64 {
        (self.f1[j])(input)
    }

    pub(crate) fn eval_c2_unchecked(&self, i: usize, j: usize, input: &[f64]) -> f64 {
        (self.f2[self.packed_index(i, j)])(input)
    }

    fn checked<'a, V: Vector + ?Sized>(&self, input: &'a V) -> Result<&'a [f64], ExprError> {
        let input = input.as_slice();
        let expected = self.arity();
        if input.len() < expected {
            return Err(ExprError::InvalidInputLength {
                expected,
                got: input.len(),
            });
        }
        Ok(input)
    }

    /// Position of `(i, j)` in the row-major packed upper triangle.
    fn packed_index(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i <= j { (i, j) } else { (j, i) };
        i * (2 * self.n_params - i + 1) / 2 + (j - i)
    }
}

impl fmt::Debug for DerivativeBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "DerivativeBundle".bold())?;
        writeln!(f, "  {}: {}", "C0".cyan(), self.c0)?;
        for (j, e) in self.c1.iter().enumerate() {
            writeln!(f, "  {}[{}]: {}", "C1".cyan(), j, e)?;
        }
        let pairs = (0..self.n_params).flat_map(|i| (i..self.n_params).map(move |j| (i, j)));
        for ((i, j), e) in pairs.zip_eq(&self.c2) {
            if !e.is_int(0) {
                writeln!(f, "  {}[{}][{}]: {}", "C2".cyan(), i, j, e)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{cos, sin};
    use approx::assert_relative_eq;

    fn x() -> Expr {
        Expr::var(0, "x")
    }

    fn y() -> Expr {
        Expr::var(1, "y")
    }

    #[test]
    fn test_packed_indices_cover_upper_triangle() {
        let bundle = DerivativeBundle::new(x() * y() * Expr::var(2, "z"), 3).unwrap();
        let mut seen = Vec::new();
        for i in 0..3 {
            for j in i..3 {
                seen.push(bundle.packed_index(i, j));
                assert_eq!(bundle.packed_index(i, j), bundle.packed_index(j, i));
            }
        }
        assert_eq!(seen, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn test_second_derivatives_differentiate_first() {
        let c0 = sin(x()) * y() * y();
        let bundle = DerivativeBundle::new(c0.clone(), 2).unwrap();

        assert_eq!(bundle.c1(0), &c0.pdiff_index(0));
        assert_eq!(bundle.c1(1), &c0.pdiff_index(1));
        // C2(i, j) = d/dx_i (C1[j])
        assert_eq!(bundle.c2(0, 1), &c0.pdiff_index(1).pdiff_index(0));
        assert_eq!(bundle.c2(1, 1), &(sin(x()) + sin(x())));
    }

    #[test]
    fn test_evaluation_matches_expressions() {
        let c0 = cos(x() * y()) + x() * x() * Expr::var(2, "d");
        let bundle = DerivativeBundle::new(c0, 2).unwrap();
        let input = [0.3, 1.7, 2.0];

        assert_eq!(bundle.arity(), 3);
        assert_relative_eq!(
            bundle.eval_c0(&input).unwrap(),
            bundle.c0().eval(&input).unwrap()
        );
        for i in 0..2 {
            assert_relative_eq!(
                bundle.eval_c1(i, &input).unwrap(),
                bundle.c1(i).eval(&input).unwrap()
            );
            for j in 0..2 {
                assert_relative_eq!(
                    bundle.eval_c2(i, j, &input).unwrap(),
                    bundle.c2(i, j).eval(&input).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_short_input_is_an_error() {
        let bundle = DerivativeBundle::new(x() * Expr::var(3, "d"), 1).unwrap();
        for result in [
            bundle.eval_c0(&[1.0]),
            bundle.eval_c1(0, &[1.0]),
            bundle.eval_c2(0, 0, &[1.0, 2.0, 3.0]),
        ] {
            assert!(matches!(
                result,
                Err(ExprError::InvalidInputLength { expected: 4, .. })
            ));
        }
        assert_eq!(bundle.eval_c1(0, &[1.0, 0.0, 0.0, 2.5]).unwrap(), 2.5);
    }

    #[test]
    fn test_clone_shares_prepared_functions() {
        let bundle = DerivativeBundle::new(x() * x(), 1).unwrap();
        let copy = bundle.clone();
        assert_eq!(copy.c1(0), bundle.c1(0));
        assert_eq!(copy.eval_c2(0, 0, &[3.0]).unwrap(), 2.0);
    }

    #[test]
    fn test_data_slots_are_not_differentiated() {
        let bundle = DerivativeBundle::new(x() * Expr::var(1, "d"), 1).unwrap();
        assert_eq!(bundle.n_params(), 1);
        assert_eq!(bundle.c1(0), &Expr::var(1, "d"));
        assert_eq!(bundle.c2(0, 0), &Expr::Int(0));
    }
}
