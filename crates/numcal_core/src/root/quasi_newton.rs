use nalgebra::{DMatrix, DVector};

use super::{RootResult, StopReason, FLAT_DERIVATIVE};
use crate::config::{Config, GradientMode};
use crate::derivative::{gradient, jacobian};
use crate::traits::Residual;

/// Sufficient-decrease constant of the Armijo test.
const ARMIJO_C: f64 = 1e-4;
/// Line search contraction factor.
const BACKTRACK: f64 = 0.5;
/// Step scale below which the line search accepts whatever it has.
const MIN_STEP_SCALE: f64 = 1e-10;
/// Smallest admissible `yᵗs` for the inverse-curvature update.
const MIN_CURVATURE: f64 = 1e-12;

/// BFGS iteration on the residual of a square system.
///
/// `H⁻¹` starts at the identity and receives the standard rank-2 update
/// only while the curvature condition holds. A failed curvature check stops
/// the iteration and keeps the last accepted point.
///
/// The line search tests sufficient decrease of `‖f‖`, so the directional
/// slope is always taken for `‖f‖` whichever merit gradient drives the
/// direction.
pub(crate) fn quasi_newton<R>(f: &R, x0: &[f64], config: &Config) -> RootResult<Vec<f64>>
where
    R: Residual + ?Sized,
{
    let dim = x0.len();
    let mut x = DVector::from_column_slice(x0);
    let mut residual = DVector::zeros(dim);
    let mut trial = DVector::zeros(dim);
    let mut h_inv = DMatrix::<f64>::identity(dim, dim);
    let identity = DMatrix::<f64>::identity(dim, dim);

    let mut residual_norm = evaluate(f, &x, &mut residual);

    for iteration in 0..config.max_iterations {
        if residual_norm < config.tolerance {
            return finish(x, iteration, residual_norm, StopReason::Converged);
        }

        let grad = descent_gradient(f, &x, &residual, config.gradient);
        if grad.norm() < FLAT_DERIVATIVE {
            return finish(x, iteration, residual_norm, StopReason::FlatDerivative);
        }

        let direction = -(&h_inv * &grad);
        let slope = merit_slope(&grad, &direction, residual_norm, config.gradient);

        // Armijo backtracking on ‖f‖.
        let mut alpha = 1.0;
        loop {
            let candidate = &x + &direction * alpha;
            let candidate_norm = evaluate(f, &candidate, &mut trial);
            if candidate_norm <= residual_norm + ARMIJO_C * alpha * slope {
                break;
            }
            alpha *= BACKTRACK;
            if alpha < MIN_STEP_SCALE {
                break;
            }
        }

        let step = &direction * alpha;
        let x_next = &x + &step;
        let next_norm = evaluate(f, &x_next, &mut trial);
        let grad_next = descent_gradient(f, &x_next, &trial, config.gradient);
        let delta_grad = &grad_next - &grad;

        let curvature = delta_grad.dot(&step);
        if curvature < MIN_CURVATURE {
            return finish(x, iteration, residual_norm, StopReason::CurvatureFailure);
        }

        let left = &identity - (&step * delta_grad.transpose()) / curvature;
        let right = &identity - (&delta_grad * step.transpose()) / curvature;
        h_inv = &left * &h_inv * &right + (&step * step.transpose()) / curvature;

        x = x_next;
        residual.copy_from(&trial);
        residual_norm = next_norm;
    }

    finish(
        x,
        config.max_iterations,
        residual_norm,
        StopReason::IterationLimit,
    )
}

fn evaluate<R>(f: &R, x: &DVector<f64>, out: &mut DVector<f64>) -> f64
where
    R: Residual + ?Sized,
{
    f.apply(x.as_slice(), out.as_mut_slice());
    out.norm()
}

/// Gradient of the merit function used for the search direction and the
/// curvature pair.
fn descent_gradient<R>(
    f: &R,
    x: &DVector<f64>,
    residual: &DVector<f64>,
    mode: GradientMode,
) -> DVector<f64>
where
    R: Residual + ?Sized,
{
    match mode {
        GradientMode::Jacobian => jacobian(f, x.as_slice()).tr_mul(residual),
        GradientMode::ResidualNorm => {
            let norm_at = |point: &[f64]| {
                let mut out = vec![0.0; point.len()];
                f.apply(point, &mut out);
                out.iter().map(|v| v * v).sum::<f64>().sqrt()
            };
            DVector::from_vec(gradient(norm_at, x.as_slice()))
        }
    }
}

/// Directional derivative of `‖f‖` along `direction`. `Jᵀf` is the
/// gradient of `½‖f‖²`, so it is rescaled by `1 / ‖f‖`.
fn merit_slope(
    grad: &DVector<f64>,
    direction: &DVector<f64>,
    residual_norm: f64,
    mode: GradientMode,
) -> f64 {
    let slope = grad.dot(direction);
    match mode {
        GradientMode::Jacobian => slope / residual_norm,
        GradientMode::ResidualNorm => slope,
    }
}

fn finish(
    x: DVector<f64>,
    iterations: usize,
    residual_norm: f64,
    stop: StopReason,
) -> RootResult<Vec<f64>> {
    RootResult::new(x.as_slice().to_vec(), iterations, residual_norm, stop)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle_diagonal(x: &[f64], out: &mut [f64]) {
        out[0] = x[0] * x[0] + x[1] * x[1] - 4.0;
        out[1] = x[0] - x[1];
    }

    #[test]
    fn jacobian_mode_converges_on_circle_diagonal() {
        let result = quasi_newton(&circle_diagonal, &[1.0, 1.0], &Config::default());
        assert_eq!(result.stop, StopReason::Converged);
        assert!(result.residual_norm < 1e-6);
        assert!(result.iterations < 20);
        let root = 2f64.sqrt();
        assert!((result.solution[0] - root).abs() < 1e-4);
        assert!((result.solution[1] - root).abs() < 1e-4);
    }

    #[test]
    fn linear_system_converges() {
        let f = |x: &[f64], out: &mut [f64]| {
            out[0] = 3.0 * x[0] + x[1] - 5.0;
            out[1] = x[0] + 2.0 * x[1] - 5.0;
            out[2] = x[2] - 0.5;
        };
        let result = quasi_newton(&f, &[0.0, 0.0, 0.0], &Config::default());
        assert!(result.converged);
        assert!((result.solution[0] - 1.0).abs() < 1e-5);
        assert!((result.solution[1] - 2.0).abs() < 1e-5);
        assert!((result.solution[2] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn starting_at_root_takes_no_steps() {
        let root = 2f64.sqrt();
        let result = quasi_newton(&circle_diagonal, &[root, root], &Config::default());
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.solution, vec![root, root]);
    }

    #[test]
    fn constant_residual_stops_on_flat_gradient() {
        let f = |_: &[f64], out: &mut [f64]| {
            out[0] = 1.0;
            out[1] = 1.0;
        };
        let result = quasi_newton(&f, &[0.0, 0.0], &Config::default());
        assert_eq!(result.stop, StopReason::FlatDerivative);
        assert!(!result.converged);
        assert_eq!(result.solution, vec![0.0, 0.0]);
    }

    #[test]
    fn unsolvable_system_never_reports_convergence() {
        // x^2 + 1 has no real zero in either component.
        let f = |x: &[f64], out: &mut [f64]| {
            out[0] = x[0] * x[0] + 1.0;
            out[1] = x[1] * x[1] + 1.0;
        };
        let config = Config::default().with_max_iterations(30);
        let result = quasi_newton(&f, &[1.0, -1.0], &config);
        assert!(!result.converged);
        assert!(result.iterations <= 30);
        assert!(result.residual_norm >= 2f64.sqrt() - 1e-9);
    }

    #[test]
    fn failed_curvature_check_keeps_previous_point() {
        // cos(x) + 2 never vanishes; the first step already loses curvature.
        let f = |x: &[f64], out: &mut [f64]| {
            out[0] = x[0].cos() + 2.0;
            out[1] = x[1].cos() + 2.0;
        };
        let result = quasi_newton(&f, &[0.1, 0.2], &Config::default());
        assert_eq!(result.stop, StopReason::CurvatureFailure);
        assert!(!result.converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.solution, vec![0.1, 0.2]);
        let expected = ((0.1f64.cos() + 2.0).powi(2) + (0.2f64.cos() + 2.0).powi(2)).sqrt();
        assert!((result.residual_norm - expected).abs() < 1e-12);
    }

    #[test]
    fn residual_norm_mode_stalls_short_of_circle_diagonal_root() {
        // The gradient of ‖f‖ flattens near the root and the curvature
        // check stops the iteration before the tolerance is met.
        let config = Config::default().with_gradient(GradientMode::ResidualNorm);
        let result = quasi_newton(&circle_diagonal, &[1.0, 1.0], &config);
        assert_eq!(result.stop, StopReason::CurvatureFailure);
        assert!(!result.converged);
        assert!(result.iterations < 10);
        assert!(result.residual_norm > config.tolerance);
        assert!(result.residual_norm < 0.05);
        let root = 2f64.sqrt();
        assert!((result.solution[0] - root).abs() < 1e-2);
        assert!((result.solution[1] - root).abs() < 1e-2);
    }

    #[test]
    fn jacobian_slope_matches_residual_norm_derivative() {
        let x = DVector::from_vec(vec![1.0, 0.5]);
        let mut residual = DVector::zeros(2);
        let norm = evaluate(&circle_diagonal, &x, &mut residual);
        let grad = descent_gradient(&circle_diagonal, &x, &residual, GradientMode::Jacobian);
        let direction = -&grad;
        let slope = merit_slope(&grad, &direction, norm, GradientMode::Jacobian);

        let eps = 1e-6;
        let mut scratch = DVector::zeros(2);
        let forward = evaluate(&circle_diagonal, &(&x + &direction * eps), &mut scratch);
        let backward = evaluate(&circle_diagonal, &(&x - &direction * eps), &mut scratch);
        let expected = (forward - backward) / (2.0 * eps);
        assert!(slope < 0.0);
        assert!((slope - expected).abs() < 1e-5 * expected.abs());
    }
}
