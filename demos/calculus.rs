//! Builds, evaluates, differentiates and simplifies a few expressions.
//!
//! ```text
//! cargo run --example calculus
//! ```

use colored::Colorize;
use exprfit::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let a = Expr::var(0, "a");
    let b = Expr::var(1, "b");
    let c = Expr::var(2, "c");
    let d = Expr::var(3, "d");
    let th = Expr::var(4, "th");
    let values = [1.0, 2.0, 3.0, 4.0, 0.5];

    println!("\n{}", "=== Evaluation ===".bright_blue().bold());
    let e = sqrt(&a + &b) * (&c - &d) - sin(&th) * cos(&th);
    println!("e       = {}", e);
    println!("e(x)    = {}", e.eval(&values)?);
    println!(
        "native  = {}",
        (1.0f64 + 2.0).sqrt() * (3.0 - 4.0) - 0.5f64.sin() * 0.5f64.cos()
    );

    println!("\n{}", "=== Partial derivatives ===".bright_green().bold());
    let e = -&a / &b * &d - (&a * &c * &a + &d) * (&a - &c) + sqrt(&a * &a + &b * &b);
    let de = e.pdiff_index(0);
    println!("e       = {}", e);
    println!("de/da   = {}", de);
    println!("value   = {}", de.eval(&values)?);

    println!("\n{}", "=== Derivative cycle of sin ===".bright_yellow().bold());
    let mut e = sin(&th);
    for order in 0..5 {
        println!("d^{} = {:<10} at 0.5: {}", order, e.to_string(), e.eval(&values)?);
        e = e.pdiff_index(4);
    }

    println!("\n{}", "=== Parsed formulas ===".bright_magenta().bold());
    for formula in ["x^3 - 2*x*y + y^2", "sqrt(x*x + y*y)", "tan(x) / (x + 0*y)"] {
        let (expr, names) = parse_with_symbols(formula)?;
        println!("{}", formula.bold());
        println!("  simplified: {}", expr.simplify());
        for (index, name) in names.iter().enumerate() {
            println!("  d/d{}: {}", name, expr.pdiff_index(index as u32));
        }
    }

    Ok(())
}
