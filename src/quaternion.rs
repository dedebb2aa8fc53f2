//! Quaternions whose four components are expressions.
//!
//! Component 0 is the real part and components 1 to 3 the imaginary parts, matching the
//! `(w, i, j, k)` order of nalgebra's `Quaternion::new`. Multiplication is the Hamilton
//! product. Combined with [`pdiff_index`](Quaternion::pdiff_index), this gives Jacobians of
//! rotation formulas written in quaternion form.
//!
//! ```rust
//! use exprfit::prelude::*;
//!
//! let q = Quaternion::from_vars(0, ["w", "x", "y", "z"]);
//! let norm = (&q * &q.conj()).simplify();
//! let values = norm.eval(&[1.0, 2.0, 3.0, 4.0]).unwrap();
//! assert_eq!(values, [30.0, 0.0, 0.0, 0.0]);
//! ```

use std::ops::{Add, Index, Mul, Sub};

use crate::backends::vector::Vector;
use crate::errors::ExprError;
use crate::expr::Expr;

/// A quaternion `t0 + t1 i + t2 j + t3 k` whose components are expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Quaternion {
    components: [Expr; 4],
}

impl Quaternion {
    /// Creates a quaternion from its scalar part `t0` and vector part `(t1, t2, t3)`.
    pub fn new(
        t0: impl Into<Expr>,
        t1: impl Into<Expr>,
        t2: impl Into<Expr>,
        t3: impl Into<Expr>,
    ) -> Self {
        Quaternion {
            components: [t0.into(), t1.into(), t2.into(), t3.into()],
        }
    }

    /// Quaternion of four named variables with consecutive indices starting at `first`.
    pub fn from_vars(first: u32, names: [&str; 4]) -> Self {
        let [n0, n1, n2, n3] = names;
        Quaternion::new(
            Expr::var(first, n0),
            Expr::var(first + 1, n1),
            Expr::var(first + 2, n2),
            Expr::var(first + 3, n3),
        )
    }

    /// Quaternion of four unnamed placeholders with consecutive indices starting at `first`.
    pub fn placeholder(first: u32) -> Self {
        Quaternion::new(
            Expr::placeholder(first),
            Expr::placeholder(first + 1),
            Expr::placeholder(first + 2),
            Expr::placeholder(first + 3),
        )
    }

    /// Quaternion of four floating point literals.
    pub fn constant(values: [f64; 4]) -> Self {
        let [a, b, c, d] = values;
        Quaternion::new(a, b, c, d)
    }

    /// Components in `(w, i, j, k)` order.
    pub fn components(&self) -> &[Expr; 4] {
        &self.components
    }

    /// Conjugate: the real part is kept and the imaginary parts are negated.
    pub fn conj(&self) -> Quaternion {
        let [t0, t1, t2, t3] = &self.components;
        Quaternion::new(t0.clone(), -t1, -t2, -t3)
    }

    /// Simplifies each component.
    pub fn simplify(&self) -> Quaternion {
        self.map(Expr::simplify)
    }

    /// Partial derivative of each component with respect to the variable at `index`.
    pub fn pdiff_index(&self, index: u32) -> Quaternion {
        self.map(|e| e.pdiff_index(index))
    }

    /// Evaluates the four components.
    pub fn eval<V: Vector + ?Sized>(&self, values: &V) -> Result<[f64; 4], ExprError> {
        let [t0, t1, t2, t3] = &self.components;
        Ok([
            t0.eval(values)?,
            t1.eval(values)?,
            t2.eval(values)?,
            t3.eval(values)?,
        ])
    }

    fn map(&self, f: impl Fn(&Expr) -> Expr) -> Quaternion {
        let [t0, t1, t2, t3] = &self.components;
        Quaternion {
            components: [f(t0), f(t1), f(t2), f(t3)],
        }
    }

    fn zip(&self, other: &Quaternion, f: impl Fn(&Expr, &Expr) -> Expr) -> Quaternion {
        let [l0, l1, l2, l3] = &self.components;
        let [r0, r1, r2, r3] = &other.components;
        Quaternion {
            components: [f(l0, r0), f(l1, r1), f(l2, r2), f(l3, r3)],
        }
    }

    fn hamilton(&self, other: &Quaternion) -> Quaternion {
        let [l0, l1, l2, l3] = &self.components;
        let [r0, r1, r2, r3] = &other.components;
        Quaternion::new(
            l0 * r0 - l1 * r1 - l2 * r2 - l3 * r3,
            l0 * r1 + l1 * r0 + l2 * r3 - l3 * r2,
            l0 * r2 - l1 * r3 + l2 * r0 + l3 * r1,
            l0 * r3 + l1 * r2 - l2 * r1 + l3 * r0,
        )
    }
}

impl Index<usize> for Quaternion {
    type Output = Expr;

    fn index(&self, index: usize) -> &Expr {
        &self.components[index]
    }
}

macro_rules! impl_quaternion_op {
    ($trait:ident, $method:ident, |$l:ident, $r:ident| $body:expr) => {
        impl $trait<&Quaternion> for &Quaternion {
            type Output = Quaternion;

            fn $method(self, rhs: &Quaternion) -> Quaternion {
                let ($l, $r) = (self, rhs);
                $body
            }
        }

        impl $trait<Quaternion> for &Quaternion {
            type Output = Quaternion;

            fn $method(self, rhs: Quaternion) -> Quaternion {
                $trait::$method(self, &rhs)
            }
        }

        impl $trait<&Quaternion> for Quaternion {
            type Output = Quaternion;

            fn $method(self, rhs: &Quaternion) -> Quaternion {
                $trait::$method(&self, rhs)
            }
        }

        impl $trait<Quaternion> for Quaternion {
            type Output = Quaternion;

            fn $method(self, rhs: Quaternion) -> Quaternion {
                $trait::$method(&self, &rhs)
            }
        }
    };
}

impl_quaternion_op!(Add, add, |l, r| l.zip(r, |a, b| a + b));
impl_quaternion_op!(Sub, sub, |l, r| l.zip(r, |a, b| a - b));
impl_quaternion_op!(Mul, mul, |l, r| l.hamilton(r));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{pack_args, Arg};
    use crate::expr::sqrt;
    use approx::assert_relative_eq;
    use nalgebra as na;

    fn assert_matches(actual: [f64; 4], expected: na::Quaternion<f64>) {
        assert_relative_eq!(actual[0], expected.w, max_relative = 1e-12);
        assert_relative_eq!(actual[1], expected.i, max_relative = 1e-12);
        assert_relative_eq!(actual[2], expected.j, max_relative = 1e-12);
        assert_relative_eq!(actual[3], expected.k, max_relative = 1e-12);
    }

    #[test]
    fn test_hamilton_product_of_units() {
        let i = Quaternion::constant([0.0, 1.0, 0.0, 0.0]);
        let j = Quaternion::constant([0.0, 0.0, 1.0, 0.0]);
        let ij = (&i * &j).eval(&[] as &[f64; 0]).unwrap();
        assert_eq!(ij, [0.0, 0.0, 0.0, 1.0]);
        let ji = (&j * &i).eval(&[] as &[f64; 0]).unwrap();
        assert_eq!(ji, [0.0, 0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_conjugate() {
        let q = Quaternion::from_vars(0, ["a", "b", "c", "d"]);
        let conj = q.conj();
        assert_eq!(conj[0], q[0]);
        assert_eq!(conj[2], -&q[2]);
        assert_eq!(conj.eval(&[1.0, 2.0, 3.0, 4.0]).unwrap(), [1.0, -2.0, -3.0, -4.0]);
    }

    #[test]
    fn test_mixed_expression_against_nalgebra() {
        // X constant, Y placeholders 0..3, Z = (|z|, z1, z2, z3) with z at 4..6
        let x = Quaternion::constant([0.5, 1.0, 1.5, 2.0]);
        let y = Quaternion::placeholder(0);
        let z1 = Expr::placeholder(4);
        let z2 = Expr::placeholder(5);
        let z3 = Expr::placeholder(6);
        let z = Quaternion::new(
            sqrt(&z1 * &z1 + &z2 * &z2 + &z3 * &z3),
            z1.clone(),
            z2.clone(),
            z3.clone(),
        );

        let expr = (&x * &y - y.conj() + &x) * &y + &x * (&y + &z);

        let y_value = na::Quaternion::new(1.0, 2.0, 3.0, 4.0);
        let inputs = pack_args([Arg::from(y_value), Arg::from(1.0), 2.0.into(), 3.0.into()]);
        assert_eq!(inputs, vec![1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0]);

        let xq = na::Quaternion::new(0.5, 1.0, 1.5, 2.0);
        let zq = na::Quaternion::new(14f64.sqrt(), 1.0, 2.0, 3.0);
        let expected = (xq * y_value - y_value.conjugate() + xq) * y_value + xq * (y_value + zq);

        assert_matches(expr.eval(&inputs).unwrap(), expected);
        assert_matches(expr.simplify().eval(&inputs).unwrap(), expected);
    }

    #[test]
    fn test_jacobian_of_rotation() {
        // d/dw of q * v * conj(q) for v = (0, 1, 0, 0) at the identity rotation
        let q = Quaternion::from_vars(0, ["q1", "q2", "q3", "q4"]);
        let v = Quaternion::constant([0.0, 1.0, 0.0, 0.0]);
        let rotated = &q * &v * q.conj();
        let values = [1.0, 0.0, 0.0, 0.0];

        assert_eq!(rotated.eval(&values).unwrap(), [0.0, 1.0, 0.0, 0.0]);
        // Rotating about z moves the x axis towards y
        let d = rotated.pdiff_index(3).eval(&values).unwrap();
        assert_eq!(d, [0.0, 0.0, 2.0, 0.0]);
    }
}
