//! Root finding for scalar and vector-valued functions.
//!
//! One-dimensional problems use Newton-Raphson with a central-difference
//! derivative; higher-dimensional problems use a BFGS quasi-Newton
//! iteration with an Armijo backtracking line search. Non-convergence is
//! reported through [`RootResult`], never as an error.

mod newton;
mod quasi_newton;

use serde::Serialize;

use crate::config::{finite, positive, Config};
use crate::error::InputError;
use crate::traits::Residual;

/// Derivative or gradient magnitude below which an iteration gives up.
pub const FLAT_DERIVATIVE: f64 = 1e-12;

/// Minimum separation between two roots reported by [`find_roots`].
pub const DUPLICATE_ROOT_SEPARATION: f64 = 1e-4;

/// Upper bound on the number of starting guesses [`find_roots`] will run.
pub const MAX_ROOT_GUESSES: usize = 100_000;

/// Why an iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    Converged,
    /// The iteration budget ran out.
    IterationLimit,
    /// The derivative (or gradient) was too flat to take a step.
    FlatDerivative,
    /// The BFGS curvature condition failed; the last accepted point is kept.
    CurvatureFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootResult<S> {
    pub solution: S,
    pub converged: bool,
    /// Number of completed updates of the iterate.
    pub iterations: usize,
    /// Norm of the residual at `solution`.
    pub residual_norm: f64,
    pub stop: StopReason,
}

impl<S> RootResult<S> {
    pub(crate) fn new(solution: S, iterations: usize, residual_norm: f64, stop: StopReason) -> Self {
        Self {
            solution,
            converged: stop == StopReason::Converged,
            iterations,
            residual_norm,
            stop,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(S) -> U) -> RootResult<U> {
        RootResult {
            solution: f(self.solution),
            converged: self.converged,
            iterations: self.iterations,
            residual_norm: self.residual_norm,
            stop: self.stop,
        }
    }
}

/// Finds `x` with `f(x) = 0`, dispatching on the dimension of `x0`.
///
/// A one-element guess runs Newton-Raphson on the scalar function
/// `x -> f([x])[0]`; longer guesses run the quasi-Newton iteration selected
/// by `config.gradient`.
pub fn solve<R>(f: R, x0: &[f64], config: &Config) -> Result<RootResult<Vec<f64>>, InputError>
where
    R: Residual,
{
    if x0.is_empty() {
        return Err(InputError::EmptyInitialGuess);
    }
    for &value in x0 {
        finite("initial guess", value)?;
    }
    config.validate_root()?;

    if x0.len() == 1 {
        let scalar = |x: f64| {
            let mut out = [0.0];
            f.apply(&[x], &mut out);
            out[0]
        };
        let result = newton::newton(&scalar, x0[0], config.tolerance, config.max_iterations);
        return Ok(result.map(|x| vec![x]));
    }

    Ok(quasi_newton::quasi_newton(&f, x0, config))
}

/// Newton-Raphson on a scalar function.
pub fn solve_scalar<F>(f: F, x0: f64, config: &Config) -> Result<RootResult<f64>, InputError>
where
    F: Fn(f64) -> f64,
{
    finite("initial guess", x0)?;
    config.validate_root()?;
    Ok(newton::newton(&f, x0, config.tolerance, config.max_iterations))
}

/// Collects the distinct roots of `f` in `[start, end]`.
///
/// Newton-Raphson is started from `start, start + step, ...` (strictly below
/// `end`). Converged roots outside the range, or closer than
/// [`DUPLICATE_ROOT_SEPARATION`] to one already found, are dropped. The
/// result is sorted ascending.
///
/// Each guess costs a full Newton run, so a range needing more than
/// [`MAX_ROOT_GUESSES`] guesses is rejected up front.
pub fn find_roots<F>(
    f: F,
    range: (f64, f64),
    step: f64,
    config: &Config,
) -> Result<Vec<f64>, InputError>
where
    F: Fn(f64) -> f64,
{
    let (start, end) = range;
    finite("range start", start)?;
    finite("range end", end)?;
    positive("step", step)?;
    if start >= end {
        return Err(InputError::InvalidSearchRange { start, end, step });
    }
    if (end - start) / step > MAX_ROOT_GUESSES as f64 {
        return Err(InputError::TooManyGuesses {
            start,
            end,
            step,
            limit: MAX_ROOT_GUESSES,
        });
    }
    config.validate_root()?;

    let mut roots: Vec<f64> = Vec::new();
    let mut k = 0usize;
    loop {
        let guess = start + k as f64 * step;
        if guess >= end {
            break;
        }
        k += 1;

        let result = newton::newton(&f, guess, config.tolerance, config.max_iterations);
        if !result.converged {
            continue;
        }
        let root = result.solution;
        if root < start || root > end {
            continue;
        }
        if roots
            .iter()
            .all(|known| (root - known).abs() >= DUPLICATE_ROOT_SEPARATION)
        {
            roots.push(root);
        }
    }

    roots.sort_by(|a, b| a.total_cmp(b));
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T, InputError>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn solve_scalar_finds_square_root() -> anyhow::Result<()> {
        let result = solve_scalar(|x| x * x - 4.0, 3.0, &Config::default())?;
        assert!(result.converged);
        assert_eq!(result.stop, StopReason::Converged);
        assert!((result.solution - 2.0).abs() < 1e-5);
        assert!(result.residual_norm < 1e-6);
        Ok(())
    }

    #[test]
    fn solve_scalar_without_real_root_does_not_converge() -> anyhow::Result<()> {
        let config = Config::default().with_max_iterations(20);
        let result = solve_scalar(|x| x * x + 1.0, 0.0, &config)?;
        assert!(!result.converged);
        assert!(result.iterations <= 20);
        Ok(())
    }

    #[test]
    fn solve_dispatches_one_element_guess_to_newton() -> anyhow::Result<()> {
        let f = |x: &[f64], out: &mut [f64]| out[0] = x[0] * x[0] - 4.0;
        let result = solve(f, &[3.0], &Config::default())?;
        assert!(result.converged);
        assert_eq!(result.solution.len(), 1);
        assert!((result.solution[0] - 2.0).abs() < 1e-5);

        let direct = solve_scalar(|x| x * x - 4.0, 3.0, &Config::default())?;
        assert_eq!(result.solution[0], direct.solution);
        assert_eq!(result.iterations, direct.iterations);
        Ok(())
    }

    #[test]
    fn solve_system_finds_circle_diagonal_intersection() -> anyhow::Result<()> {
        let f = |x: &[f64], out: &mut [f64]| {
            out[0] = x[0] * x[0] + x[1] * x[1] - 4.0;
            out[1] = x[0] - x[1];
        };
        let result = solve(f, &[1.0, 1.0], &Config::default())?;
        assert!(result.converged);
        assert!((result.solution[0] - 2f64.sqrt()).abs() < 1e-4);
        assert!((result.solution[1] - 2f64.sqrt()).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn solve_is_deterministic() -> anyhow::Result<()> {
        let f = |x: &[f64], out: &mut [f64]| {
            out[0] = x[0] * x[0] + x[1] * x[1] - 4.0;
            out[1] = x[0] - x[1];
        };
        let first = solve(f, &[1.0, 1.0], &Config::default())?;
        let second = solve(f, &[1.0, 1.0], &Config::default())?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn solve_rejects_invalid_input() {
        let f = |_: &[f64], _: &mut [f64]| {};
        assert_err_contains(solve(f, &[], &Config::default()), "positive dimension");
        assert_err_contains(
            solve(f, &[1.0, f64::NAN], &Config::default()),
            "initial guess must be finite",
        );
        assert_err_contains(
            solve(f, &[1.0], &Config::default().with_tolerance(-1.0)),
            "tolerance must be positive",
        );
        assert_err_contains(
            solve_scalar(|x| x, 1.0, &Config::default().with_max_iterations(0)),
            "max_iterations",
        );
    }

    #[test]
    fn solve_does_not_evaluate_on_invalid_input() {
        let calls = std::cell::Cell::new(0usize);
        let f = |_: &[f64], _: &mut [f64]| calls.set(calls.get() + 1);
        let _ = solve(f, &[1.0, 2.0], &Config::default().with_tolerance(0.0));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn find_roots_collects_sine_zeros() -> anyhow::Result<()> {
        let roots = find_roots(f64::sin, (-5.0, 5.0), 0.5, &Config::default())?;
        assert_eq!(roots.len(), 3);
        assert!((roots[0] + PI).abs() < 1e-6);
        assert!(roots[1].abs() < 1e-6);
        assert!((roots[2] - PI).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn find_roots_returns_empty_without_roots() -> anyhow::Result<()> {
        let roots = find_roots(|x| x * x + 1.0, (-3.0, 3.0), 0.5, &Config::default())?;
        assert!(roots.is_empty());
        Ok(())
    }

    #[test]
    fn find_roots_rejects_empty_range() {
        assert_err_contains(
            find_roots(f64::sin, (1.0, 1.0), 0.5, &Config::default()),
            "contains no guesses",
        );
        assert_err_contains(
            find_roots(f64::sin, (0.0, 1.0), 0.0, &Config::default()),
            "step must be positive",
        );
    }

    #[test]
    fn find_roots_rejects_excessive_guess_count() -> anyhow::Result<()> {
        let calls = std::cell::Cell::new(0usize);
        let f = |x: f64| {
            calls.set(calls.get() + 1);
            x.sin()
        };
        assert_err_contains(
            find_roots(f, (-5.0, 5.0), 1e-12, &Config::default()),
            "guesses",
        );
        assert_eq!(calls.get(), 0);

        let roots = find_roots(|x| x - 0.25, (0.0, 1.0), 1e-3, &Config::default())?;
        assert_eq!(roots.len(), 1);
        Ok(())
    }
}
