//! Fits a parabola to five points and solves a small nonlinear system.

use colored::Colorize;
use exprfit::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let a = Expr::var(0, "a");
    let b = Expr::var(1, "b");
    let c = Expr::var(2, "c");

    println!("\n{}", "=== Curve fit ===".bright_blue().bold());
    let x = Expr::var(3, "x");
    let y = Expr::var(4, "y");
    let fit = LeastSquares::new(&y - (&a * &x * &x + &b * &x + &c), 3, 2)?;
    println!("{}", fit);

    let points = [[-2.0, 4.0], [-1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [2.0, 4.0]];
    let mut params = vec![10.0, 10.0, 10.0];
    let mut iteration = 0;
    let report = fit.optimize(&mut params, &points, |p, r| {
        println!("  {:>2}: params = {:?}, |r| = {:e}", iteration, p.as_slice(), r.norm());
        iteration += 1;
        iteration <= 30 && r.norm() > 1e-12
    })?;
    println!(
        "fitted a = {:.6}, b = {:.6}, c = {:.6} after {} iterations (error {:e})",
        params[0],
        params[1],
        params[2],
        report.iterations(),
        report.sq_error()
    );

    println!("\n{}", "=== Equation system ===".bright_green().bold());
    let mut system = LeastSquaresSystem::new(3, 0);
    system
        .push(&a * &a + &b + &c - 18)?
        .push(&a - &b * &b + &c + 8)?
        .push(&a + &b - &c * &c + 18)?;
    println!("{}", system);

    let mut values = vec![10.0, 10.0, 10.0];
    let mut iteration = 0;
    let report = system.optimize(&mut values, |_, r| {
        iteration += 1;
        iteration <= 20 && r.norm() > 1e-12
    })?;
    println!(
        "solution a = {:.6}, b = {:.6}, c = {:.6} after {} iterations ({} rejected steps)",
        values[0],
        values[1],
        values[2],
        report.iterations(),
        report.rejected_steps()
    );

    Ok(())
}
