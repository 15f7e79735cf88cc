use serde::{Deserialize, Serialize};

/// Angles and angular velocities of both links, measured from the downward vertical.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct State {
    pub theta1: f64,
    pub omega1: f64,
    pub theta2: f64,
    pub omega2: f64,
}

impl State {
    pub fn new(theta1: f64, omega1: f64, theta2: f64, omega2: f64) -> Self {
        Self {
            theta1,
            omega1,
            theta2,
            omega2,
        }
    }

    /// Both links at rest at the given angles.
    pub fn at_rest(theta1: f64, theta2: f64) -> Self {
        Self::new(theta1, 0.0, theta2, 0.0)
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.theta1, self.omega1, self.theta2, self.omega2]
    }

    pub fn from_slice(values: &[f64]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl From<[f64; 4]> for State {
    fn from(values: [f64; 4]) -> Self {
        Self::from_slice(&values)
    }
}

impl From<State> for [f64; 4] {
    fn from(state: State) -> Self {
        state.to_array()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    pub state: State,
}

/// Time-ordered samples of a single integration run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trajectory {
    pub samples: Vec<Sample>,
}

impl Trajectory {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.t).collect()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Row records `[time, theta1, omega1, theta2, omega2]`.
    pub fn rows(&self) -> impl Iterator<Item = [f64; 5]> + '_ {
        self.samples.iter().map(|s| {
            let [theta1, omega1, theta2, omega2] = s.state.to_array();
            [s.t, theta1, omega1, theta2, omega2]
        })
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_array_order_is_angle_then_velocity() {
        let state = State::new(0.1, 0.2, 0.3, 0.4);
        assert_eq!(state.to_array(), [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(State::from([0.1, 0.2, 0.3, 0.4]), state);
        assert_eq!(State::at_rest(1.0, 2.0), State::new(1.0, 0.0, 2.0, 0.0));
    }

    #[test]
    fn state_finiteness() {
        assert!(State::new(1.0, 2.0, 3.0, 4.0).is_finite());
        assert!(!State::new(1.0, f64::NAN, 3.0, 4.0).is_finite());
        assert!(!State::new(1.0, 2.0, f64::INFINITY, 4.0).is_finite());
    }

    #[test]
    fn trajectory_rows_flatten_samples() {
        let trajectory = Trajectory::new(vec![
            Sample {
                t: 0.0,
                state: State::new(1.0, 2.0, 3.0, 4.0),
            },
            Sample {
                t: 0.5,
                state: State::new(5.0, 6.0, 7.0, 8.0),
            },
        ]);
        let rows: Vec<[f64; 5]> = trajectory.rows().collect();
        assert_eq!(rows, vec![[0.0, 1.0, 2.0, 3.0, 4.0], [0.5, 5.0, 6.0, 7.0, 8.0]]);
        assert_eq!(trajectory.times(), vec![0.0, 0.5]);
        assert_eq!(trajectory.last().map(|s| s.t), Some(0.5));
    }
}
