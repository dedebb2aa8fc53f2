//! Damped Gauss-Newton iteration shared by the least-squares solvers.
//!
//! Both solvers minimize a sum of squared residuals `E(x) = rᵀr`. At each iteration the
//! residuals `r`, the Jacobian `J` and the second-order term `Σ rᵢ ∇²rᵢ` are evaluated from
//! precomputed derivative expressions, giving the gradient `g = Jᵀr` and the curvature
//! `H = JᵀJ + Σ rᵢ ∇²rᵢ`. The step solves `(H + λ diag(H)) Δ = g` and the trial point is
//! `x - Δ`:
//!
//! - if the error does not increase, the step is accepted and `λ` shrinks by `scale`;
//! - otherwise, or when the damped matrix cannot be factorized, `λ` grows by `scale` and the
//!   step is recomputed from the same point.
//!
//! The caller's predicate decides whether another iteration is run. Damping retries within
//! one iteration are capped by [`LmOptions::max_damping_attempts`]. Running out of attempts
//! is reported as [`SolverError::Factorization`] when none of them produced a positive
//! definite matrix, and as [`SolverError::DampingExhausted`] otherwise.

use getset::{CopyGetters, Setters};
use log::{debug, trace, warn};
use nalgebra::{DMatrix, DVector};

use crate::{builder::Backend, errors::SolverError};

/// Options for the least-squares solvers.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct LmOptions {
    /// Initial damping factor, must be positive. Default: `0.001`.
    lambda: f64,
    /// Factor by which the damping grows after a rejected step and shrinks after an
    /// accepted one, must be greater than 1. Default: `10`.
    scale: f64,
    /// Number of damping attempts within one iteration before returning
    /// [`SolverError::DampingExhausted`]. Default: `64`.
    max_damping_attempts: usize,
    /// How derivative expressions are evaluated. Default: [`Backend::Interpreter`].
    backend: Backend,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            lambda: 0.001,
            scale: 10.0,
            max_damping_attempts: 64,
            backend: Backend::default(),
        }
    }
}

/// Summary of a finished optimization.
#[derive(Debug, Clone, Copy, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct LmReport {
    /// Number of accepted steps.
    iterations: usize,
    /// Sum of squared residuals at the returned parameters.
    sq_error: f64,
    /// Damping factor after the last step.
    lambda: f64,
    /// Number of rejected trial steps over the whole run.
    rejected_steps: usize,
    /// Number of rejected trial steps whose damped matrix could not be factorized.
    failed_factorizations: usize,
}

/// A least-squares problem as seen by the iteration.
pub(crate) trait Residuals {
    fn n_params(&self) -> usize;

    fn n_residuals(&self) -> usize;

    /// Writes the residuals at `x` into `r` and returns `rᵀr`.
    fn residuals(&self, x: &DVector<f64>, r: &mut DVector<f64>) -> f64;

    /// Writes the Jacobian at `x` into `jac`, one row per residual.
    fn jacobian(&self, x: &DVector<f64>, jac: &mut DMatrix<f64>);

    /// Adds `Σ rᵢ ∇²rᵢ` at `x` to `hessian`.
    fn add_curvature(&self, x: &DVector<f64>, r: &DVector<f64>, hessian: &mut DMatrix<f64>);
}

/// Runs damped Gauss-Newton steps on `problem` from `x` while `pred(x, r)` returns true.
///
/// On [`SolverError::DampingExhausted`] and [`SolverError::Factorization`] `x` holds the last
/// accepted parameters.
pub(crate) fn levenberg_marquardt<P, F>(
    problem: &P,
    x: &mut DVector<f64>,
    mut pred: F,
    lambda: f64,
    scale: f64,
    max_damping_attempts: usize,
) -> Result<LmReport, SolverError>
where
    P: Residuals,
    F: FnMut(&DVector<f64>, &DVector<f64>) -> bool,
{
    if !(lambda > 0.0 && lambda.is_finite() && scale > 1.0 && scale.is_finite()) {
        return Err(SolverError::InvalidDamping { lambda, scale });
    }

    let m = problem.n_residuals();
    let n = problem.n_params();

    let mut lambda = lambda;
    let mut r = DVector::zeros(m);
    let mut sq_error = problem.residuals(x, &mut r);
    let mut iterations = 0;
    let mut rejected_steps = 0;
    let mut failed_factorizations = 0;

    debug!("start: {} parameters, {} residuals, error = {}", n, m, sq_error);

    let mut jac = DMatrix::zeros(m, n);
    let mut r_trial = DVector::zeros(m);

    while pred(x, &r) {
        problem.jacobian(x, &mut jac);
        let g = jac.tr_mul(&r);
        let mut hessian = jac.tr_mul(&jac);
        problem.add_curvature(x, &r, &mut hessian);
        let diagonal = hessian.diagonal();

        let mut attempts = 0;
        let mut factorized = false;
        loop {
            if attempts == max_damping_attempts {
                warn!(
                    "no acceptable step after {} attempts, lambda = {:e}",
                    attempts, lambda
                );
                if !factorized {
                    return Err(SolverError::Factorization { attempts, lambda });
                }
                return Err(SolverError::DampingExhausted { attempts, lambda });
            }
            attempts += 1;

            let mut damped = hessian.clone();
            for k in 0..n {
                damped[(k, k)] += lambda * diagonal[k];
            }

            let Some(cholesky) = damped.cholesky() else {
                trace!("damped matrix not positive definite, lambda = {:e}", lambda);
                rejected_steps += 1;
                failed_factorizations += 1;
                lambda *= scale;
                continue;
            };
            factorized = true;

            let delta = cholesky.solve(&g);
            let x_trial = &*x - &delta;
            let sq_error_trial = problem.residuals(&x_trial, &mut r_trial);

            if sq_error_trial <= sq_error {
                debug!(
                    "iteration {}: step accepted, error {} -> {}, lambda = {:e}",
                    iterations + 1,
                    sq_error,
                    sq_error_trial,
                    lambda
                );
                *x = x_trial;
                std::mem::swap(&mut r, &mut r_trial);
                sq_error = sq_error_trial;
                lambda /= scale;
                break;
            }

            trace!(
                "step rejected, error {} > {}, lambda = {:e}",
                sq_error_trial,
                sq_error,
                lambda
            );
            rejected_steps += 1;
            lambda *= scale;
        }
        iterations += 1;
    }

    debug!(
        "done after {} iterations ({} rejected steps, {} not factorized), error = {}",
        iterations, rejected_steps, failed_factorizations, sq_error
    );

    Ok(LmReport {
        iterations,
        sq_error,
        lambda,
        rejected_steps,
        failed_factorizations,
    })
}
