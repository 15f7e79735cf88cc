//! Cartesian positions of the two bobs.
//!
//! The pivot sits at the origin with `y` pointing up, so a hanging link has
//! negative `y`.

use crate::params::Parameters;
use crate::state::{State, Trajectory};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianSample {
    pub t: f64,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CartesianTrajectory {
    pub samples: Vec<CartesianSample>,
}

impl CartesianTrajectory {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CartesianSample> {
        self.samples.iter()
    }

    /// Row records `[time, x1, y1, x2, y2]`.
    pub fn rows(&self) -> impl Iterator<Item = [f64; 5]> + '_ {
        self.samples.iter().map(|s| [s.t, s.x1, s.y1, s.x2, s.y2])
    }
}

/// Positions `((x1, y1), (x2, y2))` of the inner and outer bob.
pub fn link_positions(state: &State, params: &Parameters) -> ((f64, f64), (f64, f64)) {
    let (s1, c1) = state.theta1.sin_cos();
    let (s2, c2) = state.theta2.sin_cos();
    let x1 = params.l1 * s1;
    let y1 = -params.l1 * c1;
    let x2 = x1 + params.l2 * s2;
    let y2 = y1 - params.l2 * c2;
    ((x1, y1), (x2, y2))
}

pub fn to_cartesian(trajectory: &Trajectory, params: &Parameters) -> CartesianTrajectory {
    let samples = trajectory
        .iter()
        .map(|sample| {
            let ((x1, y1), (x2, y2)) = link_positions(&sample.state, params);
            CartesianSample {
                t: sample.t,
                x1,
                y1,
                x2,
                y2,
            }
        })
        .collect();
    CartesianTrajectory { samples }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Sample;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn params() -> Parameters {
        Parameters::new(10.0, 1.0, 1.0, 0.5, 0.8).expect("params")
    }

    #[test]
    fn hanging_and_horizontal_configurations() {
        let p = params();
        let ((x1, y1), (x2, y2)) = link_positions(&State::default(), &p);
        assert_eq!((x1, y1), (0.0, -0.5));
        assert!((x2 - 0.0).abs() < 1e-15);
        assert!((y2 + 1.3).abs() < 1e-15);

        let ((x1, y1), (x2, y2)) = link_positions(&State::at_rest(FRAC_PI_2, PI), &p);
        assert!((x1 - 0.5).abs() < 1e-15 && y1.abs() < 1e-15);
        assert!((x2 - 0.5).abs() < 1e-15 && (y2 - 0.8).abs() < 1e-12);
    }

    #[test]
    fn links_keep_their_lengths() {
        let p = params();
        let trajectory = Trajectory::new(
            (0..50)
                .map(|i| {
                    let t = i as f64 * 0.1;
                    Sample {
                        t,
                        state: State::new(3.0 * t.sin(), 0.0, -7.0 * t, 0.0),
                    }
                })
                .collect(),
        );
        let cartesian = to_cartesian(&trajectory, &p);
        assert_eq!(cartesian.len(), trajectory.len());

        for (sample, source) in cartesian.iter().zip(trajectory.iter()) {
            assert_eq!(sample.t, source.t);
            let r1 = (sample.x1.powi(2) + sample.y1.powi(2)).sqrt();
            let r2 = ((sample.x2 - sample.x1).powi(2) + (sample.y2 - sample.y1).powi(2)).sqrt();
            assert!((r1 - p.l1).abs() < 1e-12);
            assert!((r2 - p.l2).abs() < 1e-12);
        }
    }

    #[test]
    fn rows_follow_sample_order() {
        let p = params();
        let trajectory = Trajectory::new(vec![
            Sample {
                t: 0.0,
                state: State::default(),
            },
            Sample {
                t: 1.0,
                state: State::at_rest(FRAC_PI_2, 0.0),
            },
        ]);
        let rows: Vec<[f64; 5]> = to_cartesian(&trajectory, &p).rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], 0.0);
        assert_eq!(rows[1][0], 1.0);
        assert!((rows[1][1] - 0.5).abs() < 1e-15);
        assert!((rows[1][4] - (rows[1][2] - 0.8)).abs() < 1e-15);
    }
}
