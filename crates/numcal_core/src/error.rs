//! Error types.
//!
//! Ordinary non-convergence is reported through result values, never
//! through these types. `InputError` is raised before any iteration starts;
//! `OdeFailure` is what `OdeSolution::into_result` produces when an
//! integration stopped short of its end time.

use thiserror::Error;

use crate::ode::Trajectory;

/// Structurally invalid arguments, detected before the caller's function
/// is evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("initial guess must have positive dimension")]
    EmptyInitialGuess,
    #[error("initial state must have positive dimension")]
    EmptyInitialState,
    #[error("{name} must be finite")]
    NonFiniteInput { name: &'static str },
    #[error("{name} must be positive (got {value})")]
    NonPositive { name: &'static str, value: f64 },
    #[error("max_iterations must be greater than zero")]
    ZeroIterations,
    #[error("max_steps must be greater than zero")]
    ZeroSteps,
    #[error("time span must be increasing (got {start} to {end})")]
    EmptyTimeSpan { start: f64, end: f64 },
    #[error("number of subintervals must be greater than zero")]
    ZeroSubintervals,
    #[error("search range [{start}, {end}) with step {step} contains no guesses")]
    InvalidSearchRange { start: f64, end: f64, step: f64 },
    #[error("search range [{start}, {end}) with step {step} needs more than {limit} guesses")]
    TooManyGuesses {
        start: f64,
        end: f64,
        step: f64,
        limit: usize,
    },
}

/// An ODE integration that did not reach its end time. Each variant keeps
/// the samples accepted before the stop.
#[derive(Debug, Clone, Error)]
pub enum OdeFailure {
    #[error("step size underflow at t = {t} (h = {h:e})")]
    StepUnderflow { t: f64, h: f64, partial: Trajectory },
    #[error("step limit exhausted at t = {t}")]
    StepLimit { t: f64, partial: Trajectory },
    #[error("integration interrupted by observer at t = {t}")]
    Interrupted { t: f64, partial: Trajectory },
}

impl OdeFailure {
    /// Trajectory accumulated before the failure.
    pub fn partial(&self) -> &Trajectory {
        match self {
            OdeFailure::StepUnderflow { partial, .. }
            | OdeFailure::StepLimit { partial, .. }
            | OdeFailure::Interrupted { partial, .. } => partial,
        }
    }

    pub fn into_partial(self) -> Trajectory {
        match self {
            OdeFailure::StepUnderflow { partial, .. }
            | OdeFailure::StepLimit { partial, .. }
            | OdeFailure::Interrupted { partial, .. } => partial,
        }
    }
}
