//! Infix text form of expressions.
//!
//! Operators print with conventional precedence, loosest first: `+` and `-`, then `*` and
//! `/`, then prefix negation, then literals, variables and function calls. Parentheses are
//! only emitted where the tree shape would otherwise be lost, which includes the right
//! operand of `-` and `/` at equal precedence (`a - (b - c)`). Floating point literals keep
//! a decimal point so they can be told apart from integers, and unnamed variables print as
//! `<index>`.

use std::fmt;

use crate::expr::Expr;

const PREC_SUM: u8 = 1;
const PREC_PRODUCT: u8 = 2;
const PREC_NEG: u8 = 3;
const PREC_ATOM: u8 = 4;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Add(..) | Expr::Sub(..) => PREC_SUM,
        Expr::Mul(..) | Expr::Div(..) => PREC_PRODUCT,
        Expr::Neg(_) => PREC_NEG,
        Expr::Int(v) if *v < 0 => PREC_NEG,
        Expr::Const(v) if v.is_sign_negative() => PREC_NEG,
        Expr::Int(_) | Expr::Const(_) | Expr::Var(_) | Expr::Call(..) => PREC_ATOM,
    }
}

/// Writes `expr`, bracketed when it binds looser than `min`.
fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min: u8) -> fmt::Result {
    if precedence(expr) < min {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn write_binary(
    f: &mut fmt::Formatter<'_>,
    left: &Expr,
    op: &str,
    right: &Expr,
    prec: u8,
    right_min: u8,
) -> fmt::Result {
    write_operand(f, left, prec)?;
    f.write_str(op)?;
    write_operand(f, right, right_min)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(v) => write!(f, "{v}"),
            Expr::Const(v) => write!(f, "{v:?}"),
            Expr::Var(var) => match &var.name {
                Some(name) => f.write_str(name),
                None => write!(f, "<{}>", var.index),
            },
            Expr::Neg(inner) => {
                f.write_str("-")?;
                write_operand(f, inner, PREC_ATOM)
            }
            Expr::Add(l, r) => write_binary(f, l, " + ", r, PREC_SUM, PREC_SUM),
            Expr::Sub(l, r) => write_binary(f, l, " - ", r, PREC_SUM, PREC_SUM + 1),
            Expr::Mul(l, r) => write_binary(f, l, " * ", r, PREC_PRODUCT, PREC_PRODUCT),
            Expr::Div(l, r) => write_binary(f, l, " / ", r, PREC_PRODUCT, PREC_PRODUCT + 1),
            Expr::Call(func, arg) => write!(f, "{}({arg})", func.name()),
        }
    }
}
