use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars by the steppers.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A vector-valued function `f: R^n -> R^n` whose root is sought.
pub trait Residual {
    /// Evaluates the residual at `x`.
    /// x: current point
    /// out: buffer to write f(x) into, same length as `x`
    fn apply(&self, x: &[f64], out: &mut [f64]);
}

impl<F> Residual for F
where
    F: Fn(&[f64], &mut [f64]),
{
    fn apply(&self, x: &[f64], out: &mut [f64]) {
        self(x, out)
    }
}

/// Right-hand side of an initial value problem `dy/dt = f(t, y)`.
pub trait OdeSystem<T: Scalar> {
    /// Evaluates the derivative.
    /// t: current time
    /// y: current state
    /// out: buffer to write dy/dt into
    fn apply(&self, t: T, y: &[T], out: &mut [T]);
}

impl<T, F> OdeSystem<T> for F
where
    T: Scalar,
    F: Fn(T, &[T], &mut [T]),
{
    fn apply(&self, t: T, y: &[T], out: &mut [T]) {
        self(t, y, out)
    }
}
