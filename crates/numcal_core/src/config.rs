use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// How the multivariate root solver turns a residual into a descent
/// direction for `½‖f(x)‖²`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientMode {
    /// `g = Jᵀ f(x)` with a central-difference Jacobian (2n residual
    /// evaluations per gradient).
    #[default]
    Jacobian,
    /// Per-coordinate central difference of `‖f(x)‖`, perturbing one
    /// coordinate at a time.
    ResidualNorm,
}

/// Settings shared by every operation. Each operation reads only the
/// fields relevant to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tolerance: f64,
    pub max_iterations: usize,
    pub max_recursion_depth: usize,
    pub initial_step: f64,
    /// Upper bound on the ODE step. `None` means the length of the time span.
    pub max_step: Option<f64>,
    /// Upper bound on ODE step attempts, accepted and rejected.
    pub max_steps: usize,
    pub gradient: GradientMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
            max_recursion_depth: 20,
            initial_step: 1e-4,
            max_step: None,
            max_steps: 100_000,
            gradient: GradientMode::Jacobian,
        }
    }
}

impl Config {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_recursion_depth(mut self, max_recursion_depth: usize) -> Self {
        self.max_recursion_depth = max_recursion_depth;
        self
    }

    pub fn with_initial_step(mut self, initial_step: f64) -> Self {
        self.initial_step = initial_step;
        self
    }

    pub fn with_max_step(mut self, max_step: f64) -> Self {
        self.max_step = Some(max_step);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_gradient(mut self, gradient: GradientMode) -> Self {
        self.gradient = gradient;
        self
    }

    pub(crate) fn validate_root(&self) -> Result<(), InputError> {
        positive("tolerance", self.tolerance)?;
        if self.max_iterations == 0 {
            return Err(InputError::ZeroIterations);
        }
        Ok(())
    }

    pub(crate) fn validate_quadrature(&self) -> Result<(), InputError> {
        positive("tolerance", self.tolerance)
    }

    /// Validates the ODE fields and resolves the step ceiling for a span of
    /// the given length.
    pub(crate) fn validate_ode(&self, span: f64) -> Result<f64, InputError> {
        positive("tolerance", self.tolerance)?;
        positive("initial_step", self.initial_step)?;
        if self.max_steps == 0 {
            return Err(InputError::ZeroSteps);
        }
        match self.max_step {
            Some(h_max) => {
                positive("max_step", h_max)?;
                Ok(h_max)
            }
            None => Ok(span),
        }
    }
}

pub(crate) fn finite(name: &'static str, value: f64) -> Result<(), InputError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InputError::NonFiniteInput { name })
    }
}

pub(crate) fn positive(name: &'static str, value: f64) -> Result<(), InputError> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(InputError::NonPositive { name, value })
    }
}
