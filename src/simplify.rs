//! Bottom-up algebraic simplification.
//!
//! Simplification applies a fixed set of exact identities involving the integer literals 0
//! and 1. Children are simplified first, then the rules for the node itself are tried in
//! order and the first match wins:
//!
//! | Node | Rules |
//! |------|-------|
//! | `l + r` | `0 + r → r`, `l + 0 → l` |
//! | `l - r` | `l - 0 → l`, `0 - r → -r` |
//! | `l * r` | `0 * r → 0`, `l * 0 → 0`, `1 * r → r`, `l * 1 → l` |
//! | `l / r` | `0 / r → 0`, `l / 1 → l` |
//! | `-e` | `-0 → 0`, `--e → e` |
//!
//! There is no constant folding and no collection of like terms. Floating point literals are
//! never treated as 0 or 1. Because the rules only ever remove nodes, the result is never
//! larger than the input, and simplifying twice gives the same tree as simplifying once.

use std::sync::Arc;

use crate::expr::Expr;

impl Expr {
    /// Returns the simplified form of this expression.
    ///
    /// # Example
    /// ```rust
    /// use exprfit::prelude::*;
    ///
    /// let x = Expr::var(0, "x");
    /// let e = (&x * 1 + 0) * (Expr::Int(0) - &x);
    /// assert_eq!(e.simplify(), &x * -&x);
    /// ```
    pub fn simplify(&self) -> Expr {
        match self {
            Expr::Int(_) | Expr::Const(_) | Expr::Var(_) => self.clone(),

            Expr::Call(func, arg) => Expr::Call(*func, Arc::new(arg.simplify())),

            Expr::Neg(inner) => negate(inner.simplify()),

            Expr::Add(left, right) => match (left.simplify(), right.simplify()) {
                (Expr::Int(0), r) => r,
                (l, Expr::Int(0)) => l,
                (l, r) => Expr::Add(Arc::new(l), Arc::new(r)),
            },

            Expr::Sub(left, right) => match (left.simplify(), right.simplify()) {
                (l, Expr::Int(0)) => l,
                (Expr::Int(0), r) => negate(r),
                (l, r) => Expr::Sub(Arc::new(l), Arc::new(r)),
            },

            Expr::Mul(left, right) => match (left.simplify(), right.simplify()) {
                (Expr::Int(0), _) | (_, Expr::Int(0)) => Expr::Int(0),
                (Expr::Int(1), r) => r,
                (l, Expr::Int(1)) => l,
                (l, r) => Expr::Mul(Arc::new(l), Arc::new(r)),
            },

            Expr::Div(left, right) => match (left.simplify(), right.simplify()) {
                (Expr::Int(0), _) => Expr::Int(0),
                (l, Expr::Int(1)) => l,
                (l, r) => Expr::Div(Arc::new(l), Arc::new(r)),
            },
        }
    }
}

/// Negation of an already simplified expression, with the negation rules applied.
fn negate(e: Expr) -> Expr {
    match e {
        Expr::Int(0) => Expr::Int(0),
        Expr::Neg(inner) => Arc::unwrap_or_clone(inner),
        e => Expr::Neg(Arc::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{cos, sin};

    fn x() -> Expr {
        Expr::var(0, "x")
    }

    fn y() -> Expr {
        Expr::var(1, "y")
    }

    #[test]
    fn test_additive_identity() {
        // 0 + x → x
        assert_eq!((Expr::Int(0) + x()).simplify(), x());
        // x + 0 → x
        assert_eq!((x() + 0).simplify(), x());
        // 0 + 0 → 0
        assert_eq!((Expr::Int(0) + 0).simplify(), Expr::Int(0));
    }

    #[test]
    fn test_subtraction_rules() {
        // x - 0 → x
        assert_eq!((x() - 0).simplify(), x());
        // 0 - x → -x
        assert_eq!((Expr::Int(0) - x()).simplify(), -x());
        // 0 - (-x) → x
        assert_eq!((Expr::Int(0) - -x()).simplify(), x());
        // 0 - 0 → 0
        assert_eq!((Expr::Int(0) - 0).simplify(), Expr::Int(0));
    }

    #[test]
    fn test_multiplication_rules() {
        // 0 * x → 0 and x * 0 → 0
        assert_eq!((Expr::Int(0) * x()).simplify(), Expr::Int(0));
        assert_eq!((x() * 0).simplify(), Expr::Int(0));
        // 1 * x → x and x * 1 → x
        assert_eq!((Expr::Int(1) * x()).simplify(), x());
        assert_eq!((x() * 1).simplify(), x());
        // zero wins over one
        assert_eq!((Expr::Int(1) * 0).simplify(), Expr::Int(0));
    }

    #[test]
    fn test_division_rules() {
        // 0 / x → 0
        assert_eq!((Expr::Int(0) / x()).simplify(), Expr::Int(0));
        // x / 1 → x
        assert_eq!((x() / 1).simplify(), x());
        // x / x is left alone
        assert_eq!((x() / x()).simplify(), x() / x());
    }

    #[test]
    fn test_negation_rules() {
        assert_eq!((-Expr::Int(0)).simplify(), Expr::Int(0));
        assert_eq!((-(-x())).simplify(), x());
        assert_eq!((-(-(-x()))).simplify(), -x());
    }

    #[test]
    fn test_float_literals_are_not_identities() {
        let e = x() * 1.0 + 0.0;
        assert_eq!(e.simplify(), e);
        let e = x() * Expr::Const(0.0);
        assert_eq!(e.simplify(), e);
    }

    #[test]
    fn test_no_constant_folding() {
        let e = Expr::Int(2) + Expr::Int(3);
        assert_eq!(e.simplify(), e);
    }

    #[test]
    fn test_rules_apply_inside_functions() {
        assert_eq!(sin(x() * 1 + 0).simplify(), sin(x()));
        assert_eq!((cos(y()) * (Expr::Int(0) + 1)).simplify(), cos(y()));
    }

    #[test]
    fn test_simplify_is_idempotent_and_never_grows() {
        let cases = vec![
            (x() * 1 + 0) * (y() - 0),
            Expr::Int(0) - (Expr::Int(0) - x()),
            -(-(x() / 1)) + sin(Expr::Int(0) * y()),
            (x() + y()) / (Expr::Int(1) * (y() - x())),
            Expr::Int(0) - -(-(-y())),
            x() * 1.0 - Expr::Int(0) * cos(x()),
        ];
        for e in cases {
            let once = e.simplify();
            assert_eq!(once.simplify(), once, "not idempotent for {e}");
            assert!(once.node_count() <= e.node_count());
        }
    }
}
