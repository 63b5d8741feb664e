//! Initial value problems `dy/dt = f(t, y)`.
//!
//! [`integrate_ode`] runs the Dormand-Prince 5(4) pair with adaptive step
//! control: a step is accepted when `‖y5 - y4‖_∞ < tol` and the next step is
//! scaled by `(tol / err)^(1/5)`, capped at the step ceiling. A step that
//! would need to shrink below [`STEP_FLOOR`] ends the integration with
//! [`OdeStatus::StepSizeTooSmall`], keeping every sample accepted so far.
//! [`integrate_fixed`] is the classic fixed-step RK4 scheme.

mod stepper;
mod trajectory;

use serde::Serialize;

pub use stepper::{DormandPrince54, FixedStepper, Rk4};
pub use trajectory::Trajectory;

use crate::config::{finite, positive, Config};
use crate::error::{InputError, OdeFailure};
use crate::traits::OdeSystem;

/// Smallest step the adaptive integrator will attempt.
pub const STEP_FLOOR: f64 = 1e-12;

/// Guards the step-size update against a zero error estimate.
const ERROR_FLOOR: f64 = 1e-16;

/// Exponent of the step-size update, 1 / (order + 1) of the 4th order
/// estimate.
const STEP_EXPONENT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum OdeStatus {
    /// The end of the time span was reached.
    Completed,
    /// The step size underflowed at `t`; tolerance cannot be met there.
    StepSizeTooSmall { t: f64, h: f64 },
    /// `max_steps` attempts were used before reaching the end.
    StepLimit { t: f64 },
    /// A [`StepObserver`] asked to stop.
    Interrupted { t: f64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OdeStats {
    /// Right-hand side evaluations.
    pub evaluations: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl OdeStats {
    pub fn attempts(&self) -> usize {
        self.accepted + self.rejected
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OdeSolution {
    pub trajectory: Trajectory,
    pub status: OdeStatus,
    pub stats: OdeStats,
}

impl OdeSolution {
    pub fn is_complete(&self) -> bool {
        self.status == OdeStatus::Completed
    }

    /// The full trajectory, or a failure that still owns the samples
    /// accepted before the stop.
    pub fn into_result(self) -> Result<Trajectory, OdeFailure> {
        let partial = self.trajectory;
        match self.status {
            OdeStatus::Completed => Ok(partial),
            OdeStatus::StepSizeTooSmall { t, h } => {
                Err(OdeFailure::StepUnderflow { t, h, partial })
            }
            OdeStatus::StepLimit { t } => Err(OdeFailure::StepLimit { t, partial }),
            OdeStatus::Interrupted { t } => Err(OdeFailure::Interrupted { t, partial }),
        }
    }
}

/// Return flags for [`StepObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlag {
    Continue,
    Interrupt,
}

/// Hook called after every step attempt of the adaptive integrator.
///
/// `()` is the no-op observer.
pub trait StepObserver {
    /// A step of size `h` was accepted; `t` and `y` are the new time and
    /// state.
    fn accepted(&mut self, _t: f64, _h: f64, _err: f64, _y: &[f64]) -> ControlFlag {
        ControlFlag::Continue
    }

    /// A step of size `h` from `t` was rejected.
    fn rejected(&mut self, _t: f64, _h: f64, _err: f64) -> ControlFlag {
        ControlFlag::Continue
    }
}

impl StepObserver for () {}

/// Integrates `system` over `t_span = (t_start, t_end)` from `y0`.
///
/// Reads `tolerance`, `initial_step`, `max_step` and `max_steps` from
/// `config`. Only malformed input is an `Err`; how the integration ended is
/// in [`OdeSolution::status`].
pub fn integrate_ode<S>(
    system: S,
    t_span: (f64, f64),
    y0: &[f64],
    config: &Config,
) -> Result<OdeSolution, InputError>
where
    S: OdeSystem<f64>,
{
    integrate_ode_with_observer(system, t_span, y0, config, &mut ())
}

/// [`integrate_ode`] reporting every step attempt to `observer`.
pub fn integrate_ode_with_observer<S, O>(
    system: S,
    t_span: (f64, f64),
    y0: &[f64],
    config: &Config,
    observer: &mut O,
) -> Result<OdeSolution, InputError>
where
    S: OdeSystem<f64>,
    O: StepObserver + ?Sized,
{
    let (t_start, t_end) = validate_problem(t_span, y0)?;
    let h_max = config.validate_ode(t_end - t_start)?;
    let tol = config.tolerance;

    let mut stepper = DormandPrince54::<f64>::new(y0.len());
    let mut trajectory = Trajectory::new(t_start, y0);
    let mut stats = OdeStats::default();
    let mut t = t_start;
    let mut y = y0.to_vec();
    let mut h = config.initial_step.min(h_max);

    let status = loop {
        if t >= t_end {
            break OdeStatus::Completed;
        }
        // Also catches a NaN step produced by a non-finite error estimate.
        if !(h >= STEP_FLOOR) {
            break OdeStatus::StepSizeTooSmall { t, h };
        }
        if stats.attempts() >= config.max_steps {
            break OdeStatus::StepLimit { t };
        }

        let (h_step, t_next) = if t + h >= t_end {
            (t_end - t, t_end)
        } else {
            (h, t + h)
        };
        if t_next <= t {
            break OdeStatus::StepSizeTooSmall { t, h: h_step };
        }

        let err = stepper.attempt(&system, t, t_next, h_step, &y);
        let scale = (tol / (err + ERROR_FLOOR)).powf(STEP_EXPONENT);

        if err < tol {
            stepper.accept();
            t = t_next;
            y.copy_from_slice(stepper.solution());
            trajectory.push(t, &y);
            stats.accepted += 1;
            h = (h_step * scale).min(h_max);
            if observer.accepted(t, h_step, err, &y) == ControlFlag::Interrupt {
                break OdeStatus::Interrupted { t };
            }
        } else {
            stats.rejected += 1;
            h = h_step * scale;
            if observer.rejected(t, h_step, err) == ControlFlag::Interrupt {
                break OdeStatus::Interrupted { t };
            }
        }
    };
    stats.evaluations = stepper.evaluations();

    Ok(OdeSolution {
        trajectory,
        status,
        stats,
    })
}

/// Fixed-step RK4 over `t_span`. The last step is shortened to land on
/// `t_end` exactly.
pub fn integrate_fixed<S>(
    system: S,
    t_span: (f64, f64),
    y0: &[f64],
    h: f64,
) -> Result<Trajectory, InputError>
where
    S: OdeSystem<f64>,
{
    let (t_start, t_end) = validate_problem(t_span, y0)?;
    positive("step", h)?;
    let scale = t_start.abs().max(t_end.abs());
    if scale + h <= scale {
        return Err(InputError::NonPositive {
            name: "step relative to the time span",
            value: h,
        });
    }

    let mut stepper = Rk4::<f64>::new(y0.len());
    let mut trajectory = Trajectory::new(t_start, y0);
    let mut t = t_start;
    let mut y = y0.to_vec();

    while t < t_end {
        let landing = t + h >= t_end;
        let dt = if landing { t_end - t } else { h };
        stepper.step(&system, &mut t, &mut y, dt);
        if landing {
            t = t_end;
        }
        trajectory.push(t, &y);
    }

    Ok(trajectory)
}

fn validate_problem(t_span: (f64, f64), y0: &[f64]) -> Result<(f64, f64), InputError> {
    let (start, end) = t_span;
    finite("start time", start)?;
    finite("end time", end)?;
    if end <= start {
        return Err(InputError::EmptyTimeSpan { start, end });
    }
    if y0.is_empty() {
        return Err(InputError::EmptyInitialState);
    }
    for &value in y0 {
        finite("initial state", value)?;
    }
    Ok((start, end))
}
