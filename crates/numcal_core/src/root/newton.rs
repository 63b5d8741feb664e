use super::{RootResult, StopReason, FLAT_DERIVATIVE};
use crate::derivative::derivative;

/// Newton-Raphson with a central-difference derivative.
///
/// Stops as converged once `|f(x)| < tol`, as flat once `|f'(x)|` drops
/// below [`FLAT_DERIVATIVE`], and otherwise after `max_iter` updates.
pub(crate) fn newton<F>(f: &F, x0: f64, tol: f64, max_iter: usize) -> RootResult<f64>
where
    F: Fn(f64) -> f64 + ?Sized,
{
    let mut x = x0;
    for iteration in 0..max_iter {
        let y = f(x);
        if y.abs() < tol {
            return RootResult::new(x, iteration, y.abs(), StopReason::Converged);
        }

        let slope = derivative(f, x);
        if slope.abs() < FLAT_DERIVATIVE {
            return RootResult::new(x, iteration, y.abs(), StopReason::FlatDerivative);
        }

        x -= y / slope;
    }

    RootResult::new(x, max_iter, f(x).abs(), StopReason::IterationLimit)
}
