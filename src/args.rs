//! Packing of heterogeneous arguments into a flat evaluation input.
//!
//! Expressions read their inputs from one flat `&[f64]`. When some of the inputs are
//! quaternions, each one occupies four consecutive slots in `(w, i, j, k)` order, so
//! placeholders of a [`Quaternion`](crate::quaternion::Quaternion) built at index `k` read
//! `x[k..k + 4]`.

/// A single evaluation argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg {
    Scalar(f64),
    Quaternion([f64; 4]),
}

impl Arg {
    /// Number of input slots this argument occupies.
    pub fn width(&self) -> usize {
        match self {
            Arg::Scalar(_) => 1,
            Arg::Quaternion(_) => 4,
        }
    }

    fn extend_into(&self, out: &mut Vec<f64>) {
        match self {
            Arg::Scalar(v) => out.push(*v),
            Arg::Quaternion(q) => out.extend_from_slice(q),
        }
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Scalar(value)
    }
}

impl From<[f64; 4]> for Arg {
    fn from(value: [f64; 4]) -> Self {
        Arg::Quaternion(value)
    }
}

impl From<nalgebra::Quaternion<f64>> for Arg {
    fn from(q: nalgebra::Quaternion<f64>) -> Self {
        Arg::Quaternion([q.w, q.i, q.j, q.k])
    }
}

/// Flattens arguments left to right into one input vector.
///
/// # Example
/// ```rust
/// use exprfit::prelude::*;
///
/// let input = pack_args([Arg::from(0.5), Arg::from([1.0, 2.0, 3.0, 4.0]), Arg::from(6.0)]);
/// assert_eq!(input, vec![0.5, 1.0, 2.0, 3.0, 4.0, 6.0]);
/// ```
pub fn pack_args<I>(args: I) -> Vec<f64>
where
    I: IntoIterator,
    I::Item: Into<Arg>,
{
    let args: Vec<Arg> = args.into_iter().map(Into::into).collect();
    let mut out = Vec::with_capacity(args.iter().map(Arg::width).sum());
    for arg in &args {
        arg.extend_into(&mut out);
    }
    out
}
