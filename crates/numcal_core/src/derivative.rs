//! Central-difference derivative estimates.
//!
//! All estimates use the fixed perturbation [`STEP`]. Nothing is trapped:
//! if the function is undefined near `x` the returned value is whatever
//! floating-point value the differences produce.

use nalgebra::DMatrix;

use crate::traits::Residual;

/// Perturbation used by every estimate in this module.
pub const STEP: f64 = 1e-8;

/// `(f(x + h) - f(x - h)) / 2h`.
pub fn derivative<F>(f: F, x: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    (f(x + STEP) - f(x - STEP)) / (2.0 * STEP)
}

/// Gradient of a scalar field, perturbing one coordinate at a time.
/// Costs `2n` evaluations of `f`.
pub fn gradient<F>(f: F, x: &[f64]) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut probe = x.to_vec();
    let mut grad = vec![0.0; x.len()];
    for i in 0..x.len() {
        probe[i] = x[i] + STEP;
        let forward = f(&probe);
        probe[i] = x[i] - STEP;
        let backward = f(&probe);
        probe[i] = x[i];
        grad[i] = (forward - backward) / (2.0 * STEP);
    }
    grad
}

/// Jacobian of a residual, column `j` holding the central difference in
/// coordinate `j`. Costs `2n` residual evaluations.
pub fn jacobian<R>(f: &R, x: &[f64]) -> DMatrix<f64>
where
    R: Residual + ?Sized,
{
    let dim = x.len();
    let mut jac = DMatrix::zeros(dim, dim);
    let mut probe = x.to_vec();
    let mut forward = vec![0.0; dim];
    let mut backward = vec![0.0; dim];
    for j in 0..dim {
        probe[j] = x[j] + STEP;
        f.apply(&probe, &mut forward);
        probe[j] = x[j] - STEP;
        f.apply(&probe, &mut backward);
        probe[j] = x[j];
        for i in 0..dim {
            jac[(i, j)] = (forward[i] - backward[i]) / (2.0 * STEP);
        }
    }
    jac
}
