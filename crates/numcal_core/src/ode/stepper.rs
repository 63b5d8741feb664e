use crate::traits::{OdeSystem, Scalar};

/// A solver that advances a system by one fixed step.
pub trait FixedStepper<T: Scalar> {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// state: current state (updated after step)
    /// dt: step size
    fn step(&mut self, system: &impl OdeSystem<T>, t: &mut T, state: &mut [T], dt: T);
}

fn constant<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// Classic fourth-order Runge-Kutta with preallocated stage buffers.
pub struct Rk4<T: Scalar> {
    k: [Vec<T>; 4],
    tmp: Vec<T>,
}

impl<T: Scalar> Rk4<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k: std::array::from_fn(|_| vec![z; dim]),
            tmp: vec![z; dim],
        }
    }
}

impl<T: Scalar> FixedStepper<T> for Rk4<T> {
    fn step(&mut self, system: &impl OdeSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let half = constant::<T>(0.5);
        let two = constant::<T>(2.0);
        let t0 = *t;

        // Stage s is evaluated at t0 + nodes[s] * dt from y + nodes[s] * dt * k[s - 1].
        let nodes = [T::zero(), half, half, T::one()];
        system.apply(t0, state, &mut self.k[0]);
        for s in 1..4 {
            let scale = nodes[s] * dt;
            for (i, y) in state.iter().enumerate() {
                self.tmp[i] = *y + scale * self.k[s - 1][i];
            }
            system.apply(t0 + scale, &self.tmp, &mut self.k[s]);
        }

        let sixth = dt / constant::<T>(6.0);
        let [k1, k2, k3, k4] = &self.k;
        for (i, y) in state.iter_mut().enumerate() {
            *y = *y + sixth * (k1[i] + two * k2[i] + two * k3[i] + k4[i]);
        }

        *t = t0 + dt;
    }
}

// Dormand-Prince 5(4) tableau.
const STAGES: usize = 7;

const C: [f64; STAGES] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

const A: [[f64; STAGES - 1]; STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

/// 5th order weights (equal to the last row of `A`).
const B5: [f64; STAGES] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];

/// Embedded 4th order weights.
const B4: [f64; STAGES] = [
    5179.0 / 57600.0,
    0.0,
    7571.0 / 16695.0,
    393.0 / 640.0,
    -92097.0 / 339200.0,
    187.0 / 2100.0,
    1.0 / 40.0,
];

/// Dormand-Prince 5(4) embedded pair.
///
/// One [`attempt`](Self::attempt) evaluates the seven stages and forms both
/// the 5th and 4th order solutions; the caller decides whether to
/// [`accept`](Self::accept) it. The last stage is evaluated at the accepted
/// point and becomes the first stage of the next attempt.
pub struct DormandPrince54<T: Scalar> {
    k: [Vec<T>; STAGES],
    tmp: Vec<T>,
    y4: Vec<T>,
    y5: Vec<T>,
    c: [T; STAGES],
    a: [[T; STAGES - 1]; STAGES],
    b5: [T; STAGES],
    b4: [T; STAGES],
    primed: bool,
    evaluations: usize,
}

impl<T: Scalar> DormandPrince54<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k: std::array::from_fn(|_| vec![z; dim]),
            tmp: vec![z; dim],
            y4: vec![z; dim],
            y5: vec![z; dim],
            c: C.map(constant::<T>),
            a: A.map(|row| row.map(constant::<T>)),
            b5: B5.map(constant::<T>),
            b4: B4.map(constant::<T>),
            primed: false,
            evaluations: 0,
        }
    }

    /// Attempts a step of size `h` from `(t, y)` and returns
    /// `‖y5 - y4‖_∞`. Stages with node 1 are evaluated at `t_next`, which the
    /// caller passes so a step clamped to the end of the span lands on it
    /// exactly.
    pub fn attempt(
        &mut self,
        system: &impl OdeSystem<T>,
        t: T,
        t_next: T,
        h: T,
        y: &[T],
    ) -> T {
        let n = y.len();
        if !self.primed {
            system.apply(t, y, &mut self.k[0]);
            self.evaluations += 1;
            self.primed = true;
        }

        for s in 1..STAGES {
            for i in 0..n {
                let mut acc = T::zero();
                for j in 0..s {
                    acc = acc + self.a[s][j] * self.k[j][i];
                }
                self.tmp[i] = y[i] + h * acc;
            }
            let ts = if C[s] == 1.0 { t_next } else { t + self.c[s] * h };
            system.apply(ts, &self.tmp, &mut self.k[s]);
            self.evaluations += 1;
        }

        let mut err = T::zero();
        for i in 0..n {
            let mut acc5 = T::zero();
            let mut acc4 = T::zero();
            for j in 0..STAGES {
                acc5 = acc5 + self.b5[j] * self.k[j][i];
                acc4 = acc4 + self.b4[j] * self.k[j][i];
            }
            self.y5[i] = y[i] + h * acc5;
            self.y4[i] = y[i] + h * acc4;
            let diff = (self.y5[i] - self.y4[i]).abs();
            // NaN must win so the caller sees a non-finite error.
            if diff > err || diff.is_nan() {
                err = diff;
            }
        }
        err
    }

    /// 5th order solution of the last attempt.
    pub fn solution(&self) -> &[T] {
        &self.y5
    }

    /// 4th order solution of the last attempt.
    pub fn embedded_solution(&self) -> &[T] {
        &self.y4
    }

    /// Commits the last attempt: its final stage becomes the next first
    /// stage.
    pub fn accept(&mut self) {
        self.k.swap(0, STAGES - 1);
    }

    /// Number of right-hand side evaluations so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}
