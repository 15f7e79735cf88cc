use crate::error::{SimulationError, SimulationResult};
use serde::Serialize;

/// Strictly increasing, finite output times.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputGrid {
    times: Vec<f64>,
}

impl OutputGrid {
    /// `num_points` evenly spaced times from `t0` to `t_stop`, both included.
    /// The last time is exactly `t_stop`.
    pub fn uniform(t0: f64, t_stop: f64, num_points: usize) -> SimulationResult<Self> {
        if !t0.is_finite() || !t_stop.is_finite() {
            return Err(SimulationError::InvalidGrid(format!(
                "interval bounds must be finite, got [{t0}, {t_stop}]"
            )));
        }
        if t_stop <= t0 {
            return Err(SimulationError::InvalidGrid(format!(
                "stop time {t_stop} must exceed start time {t0}"
            )));
        }
        if num_points < 2 {
            return Err(SimulationError::InvalidGrid(format!(
                "a uniform grid needs at least two points, got {num_points}"
            )));
        }

        let span = t_stop - t0;
        let last = (num_points - 1) as f64;
        let mut times: Vec<f64> = (0..num_points)
            .map(|i| t0 + span * (i as f64) / last)
            .collect();
        times[num_points - 1] = t_stop;
        Self::from_times(times)
    }

    pub fn from_times(times: Vec<f64>) -> SimulationResult<Self> {
        if times.is_empty() {
            return Err(SimulationError::InvalidGrid(
                "output grid must contain at least one time".to_string(),
            ));
        }
        if let Some(bad) = times.iter().find(|t| !t.is_finite()) {
            return Err(SimulationError::InvalidGrid(format!(
                "output times must be finite, got {bad}"
            )));
        }
        if let Some(idx) = times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SimulationError::InvalidGrid(format!(
                "output times must be strictly increasing (index {} = {}, index {} = {})",
                idx,
                times[idx],
                idx + 1,
                times[idx + 1]
            )));
        }
        Ok(Self { times })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn first(&self) -> f64 {
        self.times[0]
    }

    pub fn last(&self) -> f64 {
        self.times[self.times.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_grid_hits_both_endpoints() {
        let grid = OutputGrid::uniform(0.0, 10.0, 250).expect("grid");
        assert_eq!(grid.len(), 250);
        assert_eq!(grid.first(), 0.0);
        assert_eq!(grid.last(), 10.0);
        assert!(grid.times().windows(2).all(|w| w[1] > w[0]));
        let spacing = 10.0 / 249.0;
        assert!((grid.times()[1] - spacing).abs() < 1e-15);
    }

    #[test]
    fn uniform_grid_rejects_bad_requests() {
        assert!(matches!(
            OutputGrid::uniform(0.0, 10.0, 1),
            Err(SimulationError::InvalidGrid(_))
        ));
        assert!(OutputGrid::uniform(5.0, 5.0, 10).is_err());
        assert!(OutputGrid::uniform(5.0, 1.0, 10).is_err());
        assert!(OutputGrid::uniform(0.0, f64::INFINITY, 10).is_err());
    }

    #[test]
    fn explicit_grid_validation() {
        assert!(OutputGrid::from_times(vec![]).is_err());
        assert!(OutputGrid::from_times(vec![0.0, 1.0, 1.0]).is_err());
        assert!(OutputGrid::from_times(vec![0.0, f64::NAN]).is_err());
        let grid = OutputGrid::from_times(vec![0.5]).expect("single time");
        assert_eq!(grid.first(), grid.last());

        let err = OutputGrid::from_times(vec![0.0, 2.0, 1.0]).expect_err("unordered");
        let message = format!("{err}");
        assert!(message.contains("strictly increasing"), "{message}");
    }
}
