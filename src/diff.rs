//! Symbolic partial differentiation.
//!
//! Every node of the derivative is simplified as soon as it is built, so derivative trees
//! never accumulate `x * 0` or `0 + y` terms and higher derivatives stay compact. The result
//! of differentiating any expression is therefore already simplified.

use std::sync::Arc;

use crate::expr::{Expr, Func, VarRef};

impl Expr {
    /// Partial derivative with respect to a variable.
    ///
    /// Only the index of `wrt` matters; its name is ignored.
    pub fn pdiff(&self, wrt: &VarRef) -> Expr {
        self.pdiff_index(wrt.index)
    }

    /// Partial derivative with respect to the variable with input index `index`.
    ///
    /// The rules implemented are:
    /// - d/dx(c) = 0 for integer and floating point literals
    /// - d/dx(x) = 1, d/dx(y) = 0 for any other variable
    /// - Sum and difference rules
    /// - Product rule: d/dx(f * g) = f' * g + f * g'
    /// - Quotient rule: d/dx(f / g) = (f' * g - f * g') / (g * g), or f' / g when g' is 0
    /// - Negation: d/dx(-f) = -(f')
    /// - Chain rule for calls: d/dx(F(f)) = F'(f) * f'
    ///
    /// # Example
    /// ```rust
    /// use exprfit::prelude::*;
    ///
    /// let x = Expr::var(0, "x");
    /// let y = Expr::var(1, "y");
    /// assert_eq!((&x * &y).pdiff_index(0), y);
    /// assert_eq!((&x * &y).pdiff_index(2), Expr::Int(0));
    /// ```
    pub fn pdiff_index(&self, index: u32) -> Expr {
        match self {
            Expr::Int(_) | Expr::Const(_) => Expr::Int(0),

            Expr::Var(var) => {
                if var.index == index {
                    Expr::Int(1)
                } else {
                    Expr::Int(0)
                }
            }

            Expr::Neg(inner) => {
                // d/dx(-f) = -(df/dx)
                Expr::Neg(Arc::new(inner.pdiff_index(index))).simplify()
            }

            Expr::Add(left, right) => {
                // d/dx(f + g) = df/dx + dg/dx
                Expr::Add(
                    Arc::new(left.pdiff_index(index)),
                    Arc::new(right.pdiff_index(index)),
                )
                .simplify()
            }

            Expr::Sub(left, right) => {
                // d/dx(f - g) = df/dx - dg/dx
                Expr::Sub(
                    Arc::new(left.pdiff_index(index)),
                    Arc::new(right.pdiff_index(index)),
                )
                .simplify()
            }

            Expr::Mul(left, right) => {
                // d/dx(f * g) = df/dx * g + f * dg/dx
                Expr::Add(
                    Arc::new(Expr::Mul(
                        Arc::new(left.pdiff_index(index)),
                        Arc::clone(right),
                    )),
                    Arc::new(Expr::Mul(
                        Arc::clone(left),
                        Arc::new(right.pdiff_index(index)),
                    )),
                )
                .simplify()
            }

            Expr::Div(left, right) => {
                let d_left = Arc::new(left.pdiff_index(index));
                let d_right = right.pdiff_index(index);
                if d_right.is_int(0) {
                    // d/dx(f / c) = (df/dx) / c
                    Expr::Div(d_left, Arc::clone(right)).simplify()
                } else {
                    // d/dx(f / g) = (df/dx * g - f * dg/dx) / (g * g)
                    Expr::Div(
                        Arc::new(Expr::Sub(
                            Arc::new(Expr::Mul(d_left, Arc::clone(right))),
                            Arc::new(Expr::Mul(Arc::clone(left), Arc::new(d_right))),
                        )),
                        Arc::new(Expr::Mul(Arc::clone(right), Arc::clone(right))),
                    )
                    .simplify()
                }
            }

            Expr::Call(func, arg) => {
                // d/dx(F(f)) = F'(f) * df/dx
                Expr::Mul(
                    Arc::new(outer_derivative(*func, arg)),
                    Arc::new(arg.pdiff_index(index)),
                )
                .simplify()
            }
        }
    }

    /// Partial derivative of order `order` with respect to one variable.
    ///
    /// An order of zero returns the expression unchanged.
    pub fn pdiff_n(&self, index: u32, order: usize) -> Expr {
        (0..order).fold(self.clone(), |acc, _| acc.pdiff_index(index))
    }
}

/// Derivative of a function with respect to its argument, evaluated at `arg`.
fn outer_derivative(func: Func, arg: &Arc<Expr>) -> Expr {
    match func {
        // 1 / (2 * sqrt(f))
        Func::Sqrt => Expr::Div(
            Arc::new(Expr::Const(1.0)),
            Arc::new(Expr::Mul(
                Arc::new(Expr::Const(2.0)),
                Arc::new(Expr::Call(Func::Sqrt, Arc::clone(arg))),
            )),
        ),
        Func::Sin => Expr::Call(Func::Cos, Arc::clone(arg)),
        Func::Cos => Expr::Neg(Arc::new(Expr::Call(Func::Sin, Arc::clone(arg)))),
        // 1 / (cos(f) * cos(f))
        Func::Tan => {
            let cos = Arc::new(Expr::Call(Func::Cos, Arc::clone(arg)));
            Expr::Div(
                Arc::new(Expr::Const(1.0)),
                Arc::new(Expr::Mul(Arc::clone(&cos), cos)),
            )
        }
    }
}

/// Partial derivative of `expr` with respect to `wrt`.
///
/// Free-function form of [`Expr::pdiff`].
pub fn pdiff(expr: &Expr, wrt: &VarRef) -> Expr {
    expr.pdiff(wrt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{cos, sin, sqrt, tan};
    use approx::assert_relative_eq;

    fn x() -> Expr {
        Expr::var(0, "x")
    }

    fn y() -> Expr {
        Expr::var(1, "y")
    }

    fn central_difference(e: &Expr, values: &[f64], index: usize) -> f64 {
        let h = 1e-6;
        let mut plus = values.to_vec();
        let mut minus = values.to_vec();
        plus[index] += h;
        minus[index] -= h;
        (e.eval(&plus).unwrap() - e.eval(&minus).unwrap()) / (2.0 * h)
    }

    #[test]
    fn test_terminals() {
        assert_eq!(Expr::Int(7).pdiff_index(0), Expr::Int(0));
        assert_eq!(Expr::Const(2.5).pdiff_index(0), Expr::Int(0));
        assert_eq!(x().pdiff_index(0), Expr::Int(1));
        assert_eq!(x().pdiff_index(1), Expr::Int(0));
    }

    #[test]
    fn test_name_does_not_matter() {
        let e = x() * x() * y();
        assert_eq!(e.pdiff(&VarRef::unnamed(0)), e.pdiff(&VarRef::new(0, "other")));
        assert_eq!(pdiff(&e, &VarRef::new(1, "y")), e.pdiff_index(1));
    }

    #[test]
    fn test_product_rule_simplifies() {
        // d/dx(x * x) = x + x
        assert_eq!((x() * x()).pdiff_index(0), x() + x());
        // d/dy(x * x) = 0
        assert_eq!((x() * x()).pdiff_index(1), Expr::Int(0));
    }

    #[test]
    fn test_quotient_rule_with_constant_denominator() {
        // d/dx(x / y) = 1 / y
        assert_eq!((x() / y()).pdiff_index(0), Expr::Int(1) / y());
        // d/dx(x / 2) = 1 / 2
        assert_eq!((x() / 2).pdiff_index(0), Expr::Int(1) / 2);
    }

    #[test]
    fn test_quotient_rule_general() {
        // d/dy(x / y) = (0 * y - x * 1) / (y * y) = -x / (y * y)
        let expected = -x() / (y() * y());
        assert_eq!((x() / y()).pdiff_index(1), expected);
    }

    #[test]
    fn test_trig_cycle() {
        let d1 = sin(x()).pdiff_index(0);
        assert_eq!(d1, cos(x()));
        let d2 = d1.pdiff_index(0);
        assert_eq!(d2, -sin(x()));
        let d3 = d2.pdiff_index(0);
        assert_eq!(d3, -cos(x()));
        let d4 = d3.pdiff_index(0);
        assert_eq!(d4, sin(x()));
        assert_eq!(sin(x()).pdiff_n(0, 4), sin(x()));
        assert_eq!(sin(x()).pdiff_n(0, 0), sin(x()));
    }

    #[test]
    fn test_sqrt_and_tan_derivatives() {
        let expected = Expr::Const(1.0) / (Expr::Const(2.0) * sqrt(x()));
        assert_eq!(sqrt(x()).pdiff_index(0), expected);

        let expected = Expr::Const(1.0) / (cos(x()) * cos(x()));
        assert_eq!(tan(x()).pdiff_index(0), expected);
    }

    #[test]
    fn test_chain_rule_keeps_inner_derivative() {
        // d/dx sin(2 * x) = cos(2 * x) * 2
        let e = sin(Expr::Int(2) * x());
        assert_eq!(e.pdiff_index(0), cos(Expr::Int(2) * x()) * 2);
    }

    #[test]
    fn test_derivative_is_simplified() {
        let cases = vec![
            sin(x() * y()) / (x() + 1),
            sqrt(x() * x() + y() * y()),
            tan(x() - y()) * -x(),
            (x() - y()) / (Expr::Const(3.0) * y()),
        ];
        for e in cases {
            for index in 0..3 {
                let d = e.pdiff_index(index);
                assert_eq!(d.simplify(), d, "derivative of {e} not simplified");
            }
        }
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let values = [0.7, 1.3];
        let cases = vec![
            x() * x() * y(),
            sin(x() * y()) / (x() + 1),
            sqrt(x() * x() + y() * y()),
            tan(x() / 3) - cos(y()) * x(),
            -(x() - y()) / (Expr::Const(3.0) * y()),
        ];
        for e in cases {
            for index in 0..2 {
                let exact = e.pdiff_index(index as u32).eval(&values).unwrap();
                let approx = central_difference(&e, &values, index);
                assert_relative_eq!(exact, approx, epsilon = 1e-6, max_relative = 1e-6);
            }
        }
    }

    #[test]
    fn test_mixed_partials_agree() {
        let values = [0.4, 2.1];
        let e = sin(x() * y()) * sqrt(x() + y() * y());
        let xy = e.pdiff_index(0).pdiff_index(1).eval(&values).unwrap();
        let yx = e.pdiff_index(1).pdiff_index(0).eval(&values).unwrap();
        assert_relative_eq!(xy, yx, max_relative = 1e-12);
    }
}
