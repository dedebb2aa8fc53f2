//! Symbolic Jacobians of quaternion products used in attitude estimation.
//!
//! The unknowns are an angular rate `(wx, wy, wz)` and an orientation `q = (q1, q2, q3, q4)`.
//! The demo prints the product `w * q` with `w = (1, wx, wy, wz)` and the rotated gravity
//! direction `q * z * conj(q)`, each with its Jacobian row per variable.

use colored::Colorize;
use exprfit::prelude::*;

const NAMES: [&str; 7] = ["wx", "wy", "wz", "q1", "q2", "q3", "q4"];

fn print_with_jacobian(label: &str, q: &Quaternion, components: std::ops::Range<usize>) {
    for k in components {
        println!("{}[{}] = {}", label.bold(), k, q[k]);
        for (index, name) in NAMES.iter().enumerate() {
            let derivative = q.pdiff_index(index as u32);
            println!("    d/d{:<3}: {}", name, derivative[k]);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let w = Quaternion::new(
        1,
        Expr::var(0, "wx"),
        Expr::var(1, "wy"),
        Expr::var(2, "wz"),
    );
    let q = Quaternion::from_vars(3, ["q1", "q2", "q3", "q4"]);
    let z = Quaternion::new(0, 0, 0, -1);

    println!("\n{}", "=== Rate update w * q ===".bright_blue().bold());
    let wq = (&w * &q).simplify();
    print_with_jacobian("wq", &wq, 0..4);

    println!("\n{}", "=== Gravity direction q * z * conj(q) ===".bright_green().bold());
    let g = (&q * &z * q.conj()).simplify();
    print_with_jacobian("g", &g, 1..4);

    // At the identity orientation gravity points straight down
    let identity = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
    println!("\ng at identity = {:?}", g.eval(&identity)?);

    Ok(())
}
