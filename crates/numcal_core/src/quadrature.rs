//! Definite integrals.
//!
//! [`integrate`] is adaptive Simpson quadrature with a Richardson error
//! estimate. The subdivision runs on an explicit task stack rather than the
//! call stack; partial sums are combined in the same left-then-right tree
//! order a recursive formulation would use, so results are reproducible bit
//! for bit.

use serde::Serialize;

use crate::config::{finite, Config};
use crate::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntegrationResult {
    pub value: f64,
    pub error_estimate: f64,
    /// Number of evaluations of the integrand.
    pub evaluations: usize,
    /// Number of accepted subintervals.
    pub intervals: usize,
    /// Set when some subinterval was accepted only because the depth cap
    /// was reached.
    pub depth_exhausted: bool,
}

/// Three-point Simpson estimate on `[a, b]`.
pub fn simpson<F>(f: F, a: f64, b: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let m = 0.5 * (a + b);
    simpson_from(a, b, f(a), f(m), f(b))
}

fn simpson_from(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

/// One pending subinterval with its cached endpoint and midpoint values.
#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    m: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    tol: f64,
    depth: usize,
}

enum Task {
    Visit(Segment),
    /// Pop the two most recent partial results and push their sum.
    Combine,
}

/// Adaptive Simpson quadrature of `f` over `[a, b]`.
///
/// Each subinterval compares the sum of its two half-interval Simpson
/// estimates against the whole-interval estimate; the difference over 15 is
/// its local error. A subinterval is accepted when that error is within its
/// share of the tolerance or when `config.max_recursion_depth` is reached;
/// otherwise both halves are refined with half the tolerance.
///
/// Reversed bounds give the negated integral. Exhausting the depth cap is
/// not an error: it shows up in `depth_exhausted` and `error_estimate`.
pub fn integrate<F>(
    f: F,
    a: f64,
    b: f64,
    config: &Config,
) -> Result<IntegrationResult, InputError>
where
    F: Fn(f64) -> f64,
{
    finite("lower bound", a)?;
    finite("upper bound", b)?;
    config.validate_quadrature()?;

    let max_depth = config.max_recursion_depth;
    let m = 0.5 * (a + b);
    let mut evaluations = 3;
    let mut intervals = 0;
    let mut depth_exhausted = false;

    let mut tasks = vec![Task::Visit(Segment {
        a,
        m,
        b,
        fa: f(a),
        fm: f(m),
        fb: f(b),
        tol: config.tolerance,
        depth: 0,
    })];
    let mut partials: Vec<(f64, f64)> = Vec::new();

    while let Some(task) = tasks.pop() {
        let seg = match task {
            Task::Visit(seg) => seg,
            Task::Combine => {
                if let (Some(right), Some(left)) = (partials.pop(), partials.pop()) {
                    partials.push((left.0 + right.0, left.1 + right.1));
                }
                continue;
            }
        };

        let left_mid = 0.5 * (seg.a + seg.m);
        let right_mid = 0.5 * (seg.m + seg.b);
        let f_left_mid = f(left_mid);
        let f_right_mid = f(right_mid);
        evaluations += 2;

        let left = simpson_from(seg.a, seg.m, seg.fa, f_left_mid, seg.fm);
        let right = simpson_from(seg.m, seg.b, seg.fm, f_right_mid, seg.fb);
        let whole = simpson_from(seg.a, seg.b, seg.fa, seg.fm, seg.fb);
        let total = left + right;
        let err = (total - whole).abs() / 15.0;

        let capped = seg.depth >= max_depth;
        if capped || err <= seg.tol {
            if capped && !(err <= seg.tol) {
                depth_exhausted = true;
            }
            intervals += 1;
            partials.push((total, err));
            continue;
        }

        let tol = 0.5 * seg.tol;
        let depth = seg.depth + 1;
        tasks.push(Task::Combine);
        tasks.push(Task::Visit(Segment {
            a: seg.m,
            m: right_mid,
            b: seg.b,
            fa: seg.fm,
            fm: f_right_mid,
            fb: seg.fb,
            tol,
            depth,
        }));
        tasks.push(Task::Visit(Segment {
            a: seg.a,
            m: left_mid,
            b: seg.m,
            fa: seg.fa,
            fm: f_left_mid,
            fb: seg.fm,
            tol,
            depth,
        }));
    }

    let (value, error_estimate) = partials.pop().unwrap_or((0.0, 0.0));
    Ok(IntegrationResult {
        value,
        error_estimate,
        evaluations,
        intervals,
        depth_exhausted,
    })
}

/// Composite trapezoidal rule with `n` equal subintervals.
pub fn trapezoid<F>(f: F, a: f64, b: f64, n: usize) -> Result<f64, InputError>
where
    F: Fn(f64) -> f64,
{
    finite("lower bound", a)?;
    finite("upper bound", b)?;
    if n == 0 {
        return Err(InputError::ZeroSubintervals);
    }

    let width = (b - a) / n as f64;
    let mut previous = f(a);
    let mut area = 0.0;
    for i in 1..=n {
        let current = f(a + i as f64 * width);
        area += (previous + current) * width / 2.0;
        previous = current;
    }
    Ok(area)
}
