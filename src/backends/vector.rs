/// A trait for vector-like containers of input values and parameters.
///
/// Evaluation reads variable values through [`as_slice`](Vector::as_slice) and the solvers
/// write optimized parameters back through [`as_mut_slice`](Vector::as_mut_slice), so
/// callers can keep their data in whichever container they already use.
///
/// # Examples
///
/// ```rust
/// use exprfit::backends::vector::Vector;
///
/// let mut vec = vec![1.0, 2.0, 3.0];
/// vec.as_mut_slice()[0] = 4.0;
/// assert_eq!(Vector::as_slice(&vec), &[4.0, 2.0, 3.0]);
/// ```
pub trait Vector {
    /// Values in variable-index order.
    fn as_slice(&self) -> &[f64];

    fn as_mut_slice(&mut self) -> &mut [f64];

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Vector for Vec<f64> {
    fn as_slice(&self) -> &[f64] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [f64] {
        self
    }

    fn len(&self) -> usize {
        self.len()
    }
}

impl Vector for [f64] {
    fn as_slice(&self) -> &[f64] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [f64] {
        self
    }

    fn len(&self) -> usize {
        <[f64]>::len(self)
    }
}

/// Solver parameters can be kept in an nalgebra vector.
///
/// # Examples
///
/// ```rust
/// use exprfit::backends::vector::Vector;
/// use nalgebra::DVector;
///
/// let mut vec = DVector::<f64>::zeros(3);
/// Vector::as_mut_slice(&mut vec)[0] = 1.0;
/// assert_eq!(vec[0], 1.0);
/// ```
impl Vector for nalgebra::DVector<f64> {
    fn as_slice(&self) -> &[f64] {
        self.as_slice()
    }

    fn as_mut_slice(&mut self) -> &mut [f64] {
        self.as_mut_slice()
    }

    fn len(&self) -> usize {
        self.len()
    }
}

impl<const N: usize> Vector for [f64; N] {
    fn as_slice(&self) -> &[f64] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [f64] {
        self
    }

    fn len(&self) -> usize {
        N
    }
}
