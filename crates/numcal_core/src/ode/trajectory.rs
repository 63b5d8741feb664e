use serde::Serialize;

/// Time-ordered samples `(t, y)` of an integration.
///
/// The first sample is the initial condition and times are strictly
/// increasing. States are stored row-major in one buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    dimension: usize,
    times: Vec<f64>,
    states: Vec<f64>,
}

impl Trajectory {
    pub(crate) fn new(t0: f64, y0: &[f64]) -> Self {
        Self {
            dimension: y0.len(),
            times: vec![t0],
            states: y0.to_vec(),
        }
    }

    pub(crate) fn push(&mut self, t: f64, y: &[f64]) {
        debug_assert!(t > self.last_time(), "trajectory times must increase");
        debug_assert_eq!(y.len(), self.dimension);
        self.times.push(t);
        self.states.extend_from_slice(y);
    }

    /// Number of samples, at least one.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always `false`: the initial condition is stored on construction.
    /// Present to pair with [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn state(&self, index: usize) -> &[f64] {
        let start = index * self.dimension;
        &self.states[start..start + self.dimension]
    }

    pub fn states(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.states.chunks_exact(self.dimension)
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &[f64])> + '_ {
        self.times.iter().copied().zip(self.states())
    }

    pub fn last_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    pub fn last_state(&self) -> &[f64] {
        self.state(self.times.len() - 1)
    }

    /// Values of a single state component across all samples.
    pub fn component(&self, index: usize) -> Vec<f64> {
        self.states().map(|y| y[index]).collect()
    }

    /// Splits into `(times, states)` arrays.
    pub fn into_parts(self) -> (Vec<f64>, Vec<Vec<f64>>) {
        let states = self
            .states
            .chunks_exact(self.dimension)
            .map(<[f64]>::to_vec)
            .collect();
        (self.times, states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_stored_row_major() {
        let mut trajectory = Trajectory::new(0.0, &[1.0, 2.0]);
        trajectory.push(0.5, &[3.0, 4.0]);
        trajectory.push(1.0, &[5.0, 6.0]);

        assert!(!Trajectory::new(0.0, &[1.0]).is_empty());
        assert_eq!(trajectory.len(), 3);
        assert!(!trajectory.is_empty());
        assert_eq!(trajectory.dimension(), 2);
        assert_eq!(trajectory.times(), &[0.0, 0.5, 1.0]);
        assert_eq!(trajectory.state(1), &[3.0, 4.0]);
        assert_eq!(trajectory.last_time(), 1.0);
        assert_eq!(trajectory.last_state(), &[5.0, 6.0]);
        assert_eq!(trajectory.component(1), vec![2.0, 4.0, 6.0]);

        let pairs: Vec<(f64, Vec<f64>)> =
            trajectory.iter().map(|(t, y)| (t, y.to_vec())).collect();
        assert_eq!(pairs[2], (1.0, vec![5.0, 6.0]));

        let (times, states) = trajectory.into_parts();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        assert_eq!(states, vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
    }
}
