//! Least-squares front ends: curve fitting and systems of equations.
//!
//! [`LeastSquares`] fits parameters to data. The objective is a residual expression whose
//! first `n_fit` variables are the parameters and whose next `n_data` variables are filled
//! from one data sample at a time; the sum of squared residuals over all samples is
//! minimized.
//!
//! [`LeastSquaresSystem`] solves a system of equations written as residuals that should
//! vanish. Each pushed expression is one residual over `n_params` unknowns followed by
//! `n_aux` auxiliary inputs that are read but never changed.
//!
//! # Example
//! ```rust
//! use exprfit::prelude::*;
//!
//! // y - (a * x + b) with a, b fitted and (x, y) from the data
//! let (a, b) = (Expr::var(0, "a"), Expr::var(1, "b"));
//! let (x, y) = (Expr::var(2, "x"), Expr::var(3, "y"));
//! let fit = LeastSquares::new(&y - (&a * &x + &b), 2, 2).unwrap();
//!
//! let mut params = vec![0.0, 0.0];
//! let data = [[0.0, 1.0], [1.0, 3.0], [2.0, 5.0]];
//! let mut iterations = 0;
//! fit.optimize(&mut params, &data, |_, _| {
//!     iterations += 1;
//!     iterations <= 10
//! })
//! .unwrap();
//!
//! assert!((params[0] - 2.0).abs() < 1e-9);
//! assert!((params[1] - 1.0).abs() < 1e-9);
//! ```

use std::fmt;

use colored::Colorize;
use nalgebra::{DMatrix, DVector};

use crate::{
    backends::vector::Vector,
    derivatives::DerivativeBundle,
    errors::SolverError,
    expr::Expr,
    solver::{levenberg_marquardt, LmOptions, LmReport, Residuals},
};

/// Curve fitting of `n_fit` parameters against samples of `n_data` values.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    bundle: DerivativeBundle,
    n_fit: usize,
    n_data: usize,
    options: LmOptions,
}

impl LeastSquares {
    /// Prepares the derivatives of the residual `expr` with default options.
    ///
    /// # Errors
    /// Returns [`SolverError::ExpressionArity`] if `expr` references a variable at index
    /// `n_fit + n_data` or beyond.
    pub fn new(expr: Expr, n_fit: usize, n_data: usize) -> Result<Self, SolverError> {
        Self::with_options(expr, n_fit, n_data, LmOptions::default())
    }

    /// Prepares the derivatives of the residual `expr` with the given options.
    ///
    /// # Arguments
    /// * `expr` - Residual over `n_fit` parameters followed by `n_data` sample values
    /// * `n_fit` - Number of fitted parameters
    /// * `n_data` - Number of values in each sample
    /// * `options` - Damping settings and evaluation backend
    ///
    /// # Errors
    /// - [`SolverError::ExpressionArity`] if `expr` references a variable at index
    ///   `n_fit + n_data` or beyond
    /// - [`SolverError::Builder`] if the derivatives cannot be compiled
    pub fn with_options(
        expr: Expr,
        n_fit: usize,
        n_data: usize,
        options: LmOptions,
    ) -> Result<Self, SolverError> {
        check_arity(&expr, n_fit + n_data)?;
        let bundle = DerivativeBundle::with_backend(expr, n_fit, options.backend())?;
        Ok(LeastSquares {
            bundle,
            n_fit,
            n_data,
            options,
        })
    }

    /// Number of fitted parameters.
    pub fn n_fit(&self) -> usize {
        self.n_fit
    }

    /// Number of values in each sample.
    pub fn n_data(&self) -> usize {
        self.n_data
    }

    /// The residual and its derivatives with respect to the fitted parameters.
    pub fn bundle(&self) -> &DerivativeBundle {
        &self.bundle
    }

    /// Damping settings and evaluation backend.
    pub fn options(&self) -> &LmOptions {
        &self.options
    }

    /// Fits `params` to `samples`, iterating while `pred(params, residuals)` returns true.
    ///
    /// `params` holds the starting point on entry and the fitted parameters on return. If
    /// the damping is exhausted it holds the best parameters found.
    ///
    /// # Errors
    /// - [`SolverError::InvalidParameterLength`] if `params` does not have `n_fit` values
    /// - [`SolverError::NoResiduals`] if `samples` is empty
    /// - [`SolverError::InvalidSampleLength`] if a sample does not have `n_data` values
    /// - [`SolverError::InvalidDamping`] if the configured damping cannot grow
    /// - [`SolverError::DampingExhausted`] if no acceptable step is found
    /// - [`SolverError::Factorization`] if no damping gives a positive definite matrix
    pub fn optimize<V, S, F>(
        &self,
        params: &mut V,
        samples: &[S],
        pred: F,
    ) -> Result<LmReport, SolverError>
    where
        V: Vector + ?Sized,
        S: AsRef<[f64]>,
        F: FnMut(&DVector<f64>, &DVector<f64>) -> bool,
    {
        self.optimize_with(
            params,
            samples,
            pred,
            self.options.lambda(),
            self.options.scale(),
        )
    }

    /// Like [`optimize`](Self::optimize) with the initial damping and its scale factor
    /// given for this call.
    pub fn optimize_with<V, S, F>(
        &self,
        params: &mut V,
        samples: &[S],
        pred: F,
        lambda: f64,
        scale: f64,
    ) -> Result<LmReport, SolverError>
    where
        V: Vector + ?Sized,
        S: AsRef<[f64]>,
        F: FnMut(&DVector<f64>, &DVector<f64>) -> bool,
    {
        check_length(params.len(), self.n_fit)?;
        if samples.is_empty() {
            return Err(SolverError::NoResiduals);
        }
        for (index, sample) in samples.iter().enumerate() {
            let got = sample.as_ref().len();
            if got != self.n_data {
                return Err(SolverError::InvalidSampleLength {
                    index,
                    expected: self.n_data,
                    got,
                });
            }
        }

        let problem = CurveFit {
            fit: self,
            samples,
        };
        let mut x = DVector::from_column_slice(params.as_slice());
        let result = levenberg_marquardt(
            &problem,
            &mut x,
            pred,
            lambda,
            scale,
            self.options.max_damping_attempts(),
        );
        params.as_mut_slice().copy_from_slice(x.as_slice());
        result
    }
}

impl fmt::Display for LeastSquares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        writeln!(f, "    {}: {}", "Residual".cyan(), self.bundle.c0())?;
        writeln!(
            f,
            "    {}: {} fitted, {} per sample",
            "Variables".cyan(),
            self.n_fit,
            self.n_data
        )?;
        writeln!(f, "}}")
    }
}

struct CurveFit<'a, S> {
    fit: &'a LeastSquares,
    samples: &'a [S],
}

impl<S: AsRef<[f64]>> CurveFit<'_, S> {
    /// Calls `f` with the evaluation input of every sample at parameters `x`.
    fn for_each_input(&self, x: &DVector<f64>, mut f: impl FnMut(usize, &[f64])) {
        let n_fit = self.fit.n_fit;
        let mut input = vec![0.0; n_fit + self.fit.n_data];
        input[..n_fit].copy_from_slice(x.as_slice());
        for (i, sample) in self.samples.iter().enumerate() {
            input[n_fit..].copy_from_slice(sample.as_ref());
            f(i, &input);
        }
    }
}

impl<S: AsRef<[f64]>> Residuals for CurveFit<'_, S> {
    fn n_params(&self) -> usize {
        self.fit.n_fit
    }

    fn n_residuals(&self) -> usize {
        self.samples.len()
    }

    fn residuals(&self, x: &DVector<f64>, r: &mut DVector<f64>) -> f64 {
        let bundle = &self.fit.bundle;
        self.for_each_input(x, |i, input| r[i] = bundle.eval_c0_unchecked(input));
        r.norm_squared()
    }

    fn jacobian(&self, x: &DVector<f64>, jac: &mut DMatrix<f64>) {
        let bundle = &self.fit.bundle;
        self.for_each_input(x, |i, input| {
            for j in 0..bundle.n_params() {
                jac[(i, j)] = bundle.eval_c1_unchecked(j, input);
            }
        });
    }

    fn add_curvature(&self, x: &DVector<f64>, r: &DVector<f64>, hessian: &mut DMatrix<f64>) {
        let bundle = &self.fit.bundle;
        self.for_each_input(x, |i, input| add_weighted_c2(bundle, r[i], input, hessian));
    }
}

/// Solver for a system of equations, one residual expression per equation.
#[derive(Debug, Clone)]
pub struct LeastSquaresSystem {
    n_params: usize,
    n_aux: usize,
    options: LmOptions,
    bundles: Vec<DerivativeBundle>,
}

impl LeastSquaresSystem {
    /// Creates an empty system over `n_params` unknowns and `n_aux` auxiliary inputs.
    pub fn new(n_params: usize, n_aux: usize) -> Self {
        Self::with_options(n_params, n_aux, LmOptions::default())
    }

    /// Creates an empty system whose equations are prepared with `options`.
    pub fn with_options(n_params: usize, n_aux: usize, options: LmOptions) -> Self {
        LeastSquaresSystem {
            n_params,
            n_aux,
            options,
            bundles: Vec::new(),
        }
    }

    /// Adds an equation whose residual should be driven to zero.
    ///
    /// # Errors
    /// Returns [`SolverError::ExpressionArity`] if `expr` references a variable at index
    /// `n_params + n_aux` or beyond.
    pub fn push(&mut self, expr: Expr) -> Result<&mut Self, SolverError> {
        check_arity(&expr, self.n_params + self.n_aux)?;
        let bundle = DerivativeBundle::with_backend(expr, self.n_params, self.options.backend())?;
        self.bundles.push(bundle);
        Ok(self)
    }

    /// Number of unknowns solved for.
    pub fn n_params(&self) -> usize {
        self.n_params
    }

    /// Number of auxiliary inputs following the unknowns.
    pub fn n_aux(&self) -> usize {
        self.n_aux
    }

    /// Damping settings and evaluation backend.
    pub fn options(&self) -> &LmOptions {
        &self.options
    }

    /// Number of pushed equations.
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Returns true if no equation was pushed.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Pushed residual expressions in order.
    pub fn equations(&self) -> impl Iterator<Item = &Expr> {
        self.bundles.iter().map(DerivativeBundle::c0)
    }

    /// Solves for the first `n_params` values of `values`, iterating while
    /// `pred(params, residuals)` returns true.
    ///
    /// `values` holds the unknowns followed by the auxiliary inputs. Only the unknowns are
    /// updated; if the damping is exhausted they hold the best values found.
    ///
    /// # Errors
    /// - [`SolverError::NoResiduals`] if no equation was pushed
    /// - [`SolverError::InvalidParameterLength`] if `values` does not have
    ///   `n_params + n_aux` entries
    /// - [`SolverError::InvalidDamping`] if the configured damping cannot grow
    /// - [`SolverError::DampingExhausted`] if no acceptable step is found
    /// - [`SolverError::Factorization`] if no damping gives a positive definite matrix
    pub fn optimize<V, F>(&self, values: &mut V, pred: F) -> Result<LmReport, SolverError>
    where
        V: Vector + ?Sized,
        F: FnMut(&DVector<f64>, &DVector<f64>) -> bool,
    {
        self.optimize_with(values, pred, self.options.lambda(), self.options.scale())
    }

    /// Like [`optimize`](Self::optimize) with the initial damping and its scale factor
    /// given for this call.
    pub fn optimize_with<V, F>(
        &self,
        values: &mut V,
        pred: F,
        lambda: f64,
        scale: f64,
    ) -> Result<LmReport, SolverError>
    where
        V: Vector + ?Sized,
        F: FnMut(&DVector<f64>, &DVector<f64>) -> bool,
    {
        if self.bundles.is_empty() {
            return Err(SolverError::NoResiduals);
        }
        check_length(values.len(), self.n_params + self.n_aux)?;

        let (params, aux) = values.as_mut_slice().split_at_mut(self.n_params);
        let problem = SystemFit { system: self, aux };
        let mut x = DVector::from_column_slice(params);
        let result = levenberg_marquardt(
            &problem,
            &mut x,
            pred,
            lambda,
            scale,
            self.options.max_damping_attempts(),
        );
        params.copy_from_slice(x.as_slice());
        result
    }
}

impl fmt::Display for LeastSquaresSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        for (i, equation) in self.equations().enumerate() {
            writeln!(f, "    {} {}: {} = 0", "Equation".cyan(), i, equation)?;
        }
        writeln!(
            f,
            "    {}: {} unknowns, {} auxiliary",
            "Variables".cyan(),
            self.n_params,
            self.n_aux
        )?;
        writeln!(f, "}}")
    }
}

struct SystemFit<'a> {
    system: &'a LeastSquaresSystem,
    aux: &'a [f64],
}

impl SystemFit<'_> {
    fn input(&self, x: &DVector<f64>) -> Vec<f64> {
        let mut input = Vec::with_capacity(x.len() + self.aux.len());
        input.extend_from_slice(x.as_slice());
        input.extend_from_slice(self.aux);
        input
    }
}

impl Residuals for SystemFit<'_> {
    fn n_params(&self) -> usize {
        self.system.n_params
    }

    fn n_residuals(&self) -> usize {
        self.system.bundles.len()
    }

    fn residuals(&self, x: &DVector<f64>, r: &mut DVector<f64>) -> f64 {
        let input = self.input(x);
        for (i, bundle) in self.system.bundles.iter().enumerate() {
            r[i] = bundle.eval_c0_unchecked(&input);
        }
        r.norm_squared()
    }

    fn jacobian(&self, x: &DVector<f64>, jac: &mut DMatrix<f64>) {
        let input = self.input(x);
        for (i, bundle) in self.system.bundles.iter().enumerate() {
            for j in 0..self.system.n_params {
                jac[(i, j)] = bundle.eval_c1_unchecked(j, &input);
            }
        }
    }

    fn add_curvature(&self, x: &DVector<f64>, r: &DVector<f64>, hessian: &mut DMatrix<f64>) {
        let input = self.input(x);
        for (i, bundle) in self.system.bundles.iter().enumerate() {
            add_weighted_c2(bundle, r[i], &input, hessian);
        }
    }
}

/// Adds `weight * C2` at `input` to the symmetric `hessian`.
fn add_weighted_c2(
    bundle: &DerivativeBundle,
    weight: f64,
    input: &[f64],
    hessian: &mut DMatrix<f64>,
) {
    let n = bundle.n_params();
    for j in 0..n {
        for k in j..n {
            let v = weight * bundle.eval_c2_unchecked(j, k, input);
            hessian[(j, k)] += v;
            if j != k {
                hessian[(k, j)] += v;
            }
        }
    }
}

fn check_arity(expr: &Expr, available: usize) -> Result<(), SolverError> {
    let arity = expr.arity();
    if arity > available {
        return Err(SolverError::ExpressionArity { arity, available });
    }
    Ok(())
}

fn check_length(got: usize, expected: usize) -> Result<(), SolverError> {
    if got != expected {
        return Err(SolverError::InvalidParameterLength { expected, got });
    }
    Ok(())
}
