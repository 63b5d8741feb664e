//! Numerical core: derivative estimates, root finding, adaptive quadrature
//! and adaptive ODE integration on `f64` callables.
//!
//! Key components:
//! - **Derivative**: central differences with a fixed perturbation.
//! - **Root**: Newton-Raphson in one dimension, BFGS with Armijo line search
//!   in several.
//! - **Quadrature**: adaptive Simpson driven by an explicit work stack.
//! - **ODE**: Dormand-Prince 5(4) with adaptive step control, and fixed-step
//!   RK4.
//!
//! Every operation takes a [`Config`] and returns `Result<_, InputError>`;
//! failing to converge is reported in the returned value.

pub mod config;
pub mod derivative;
pub mod error;
pub mod ode;
pub mod quadrature;
pub mod root;
pub mod traits;

pub use config::{Config, GradientMode};
pub use error::{InputError, OdeFailure};
pub use ode::{
    integrate_fixed, integrate_ode, integrate_ode_with_observer, ControlFlag, OdeSolution,
    OdeStats, OdeStatus, StepObserver, Trajectory,
};
pub use quadrature::{integrate, IntegrationResult};
pub use root::{find_roots, solve, solve_scalar, RootResult, StopReason};
pub use traits::{OdeSystem, Residual, Scalar};
