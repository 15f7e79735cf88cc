//! Equations of motion of the planar double pendulum.
//!
//! Three equivalent formulations are provided. `Lagrangian` and `DoubleAngle`
//! integrate `(theta1, omega1, theta2, omega2)` and differ only in how the
//! closed-form accelerations are arranged; `Hamiltonian` integrates the
//! conjugate momenta `(theta1, p1, theta2, p2)` instead. All three share
//! [`Parameters`] and map to and from [`State`] so trajectories are
//! interchangeable.

use crate::error::SimulationResult;
use crate::params::Parameters;
use crate::state::State;
use crate::traits::{constant, DynamicalSystem, Scalar};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formulation {
    /// Closed-form Lagrangian accelerations with denominator `m1 + m2 sin²Δ`.
    #[default]
    Lagrangian,
    /// The same accelerations written with `2 m1 + m2 - m2 cos 2Δ`.
    DoubleAngle,
    /// Hamilton's equations in `(theta1, p1, theta2, p2)`.
    Hamiltonian,
}

impl Formulation {
    /// Maps a physical state into this formulation's integration coordinates.
    pub fn to_coordinates(self, state: &State, params: &Parameters) -> [f64; 4] {
        match self {
            Formulation::Lagrangian | Formulation::DoubleAngle => state.to_array(),
            Formulation::Hamiltonian => {
                let (p1, p2) = conjugate_momenta(state, params);
                [state.theta1, p1, state.theta2, p2]
            }
        }
    }

    /// Inverse of [`Formulation::to_coordinates`].
    pub fn to_state(self, coords: &[f64], params: &Parameters) -> State {
        match self {
            Formulation::Lagrangian | Formulation::DoubleAngle => State::from_slice(coords),
            Formulation::Hamiltonian => {
                let (omega1, omega2) =
                    angular_velocities(params, coords[0], coords[1], coords[2], coords[3]);
                State::new(coords[0], omega1, coords[2], omega2)
            }
        }
    }
}

/// Double pendulum vector field for a fixed set of parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoublePendulum {
    params: Parameters,
    formulation: Formulation,
}

impl DoublePendulum {
    pub fn new(params: Parameters) -> SimulationResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            formulation: Formulation::default(),
        })
    }

    pub fn with_formulation(mut self, formulation: Formulation) -> Self {
        self.formulation = formulation;
        self
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn formulation(&self) -> Formulation {
        self.formulation
    }

    /// Time derivative of `state` as `(theta1', omega1', theta2', omega2')`,
    /// independent of the integration formulation.
    pub fn derivative(&self, state: &State) -> State {
        derivative(state, &self.params)
    }
}

/// Closed-form Lagrangian right-hand side.
///
/// Defined for every finite state; the denominator is bounded below by `m1`.
pub fn derivative(state: &State, params: &Parameters) -> State {
    let x = state.to_array();
    let mut out = [0.0; 4];
    lagrangian_rhs(params, &x, &mut out);
    State::from(out)
}

impl<T: Scalar> DynamicalSystem<T> for DoublePendulum {
    fn dimension(&self) -> usize {
        4
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        match self.formulation {
            Formulation::Lagrangian => lagrangian_rhs(&self.params, x, out),
            Formulation::DoubleAngle => double_angle_rhs(&self.params, x, out),
            Formulation::Hamiltonian => hamiltonian_rhs(&self.params, x, out),
        }
    }
}

struct Coefficients<T> {
    g: T,
    m1: T,
    m2: T,
    l1: T,
    l2: T,
}

impl<T: Scalar> Coefficients<T> {
    fn from_params(params: &Parameters) -> Self {
        Self {
            g: constant(params.g),
            m1: constant(params.m1),
            m2: constant(params.m2),
            l1: constant(params.l1),
            l2: constant(params.l2),
        }
    }
}

fn lagrangian_rhs<T: Scalar>(params: &Parameters, x: &[T], out: &mut [T]) {
    let Coefficients { g, m1, m2, l1, l2 } = Coefficients::<T>::from_params(params);
    let (theta1, omega1, theta2, omega2) = (x[0], x[1], x[2], x[3]);

    let (s, c) = (theta1 - theta2).sin_cos();
    let w1_sq = omega1 * omega1;
    let w2_sq = omega2 * omega2;
    let denom = m1 + m2 * s * s;
    let total = m1 + m2;

    out[0] = omega1;
    out[1] = (m2 * g * theta2.sin() * c
        - m2 * s * (l1 * w1_sq * c + l2 * w2_sq)
        - total * g * theta1.sin())
        / (l1 * denom);
    out[2] = omega2;
    out[3] = (total * (l1 * w1_sq * s - g * theta2.sin() + g * theta1.sin() * c)
        + m2 * l2 * w2_sq * s * c)
        / (l2 * denom);
}

fn double_angle_rhs<T: Scalar>(params: &Parameters, x: &[T], out: &mut [T]) {
    let Coefficients { g, m1, m2, l1, l2 } = Coefficients::<T>::from_params(params);
    let (theta1, omega1, theta2, omega2) = (x[0], x[1], x[2], x[3]);
    let two: T = constant(2.0);

    let delta = theta1 - theta2;
    let (s, c) = delta.sin_cos();
    let w1_sq = omega1 * omega1;
    let w2_sq = omega2 * omega2;
    let denom = two * m1 + m2 - m2 * (two * delta).cos();

    let num1 = -g * (two * m1 + m2) * theta1.sin()
        - m2 * g * (theta1 - two * theta2).sin()
        - two * s * m2 * (w2_sq * l2 + w1_sq * l1 * c);
    let num2 = two
        * s
        * (w1_sq * l1 * (m1 + m2) + g * (m1 + m2) * theta1.cos() + w2_sq * l2 * m2 * c);

    out[0] = omega1;
    out[1] = num1 / (l1 * denom);
    out[2] = omega2;
    out[3] = num2 / (l2 * denom);
}

fn hamiltonian_rhs<T: Scalar>(params: &Parameters, x: &[T], out: &mut [T]) {
    let Coefficients { g, m1, m2, l1, l2 } = Coefficients::<T>::from_params(params);
    let (theta1, p1, theta2, p2) = (x[0], x[1], x[2], x[3]);
    let (omega1, omega2) = angular_velocities(params, theta1, p1, theta2, p2);

    let coupling = m2 * l1 * l2 * omega1 * omega2 * (theta1 - theta2).sin();

    out[0] = omega1;
    out[1] = -coupling - (m1 + m2) * g * l1 * theta1.sin();
    out[2] = omega2;
    out[3] = coupling - m2 * g * l2 * theta2.sin();
}

/// Solves the 2x2 mass matrix for the angular velocities.
///
/// The determinant is `m2 l1² l2² (m1 + m2 sin²Δ)`, never zero for valid parameters.
fn angular_velocities<T: Scalar>(
    params: &Parameters,
    theta1: T,
    p1: T,
    theta2: T,
    p2: T,
) -> (T, T) {
    let Coefficients { m1, m2, l1, l2, .. } = Coefficients::<T>::from_params(params);
    let c = (theta1 - theta2).cos();
    let a = (m1 + m2) * l1 * l1;
    let b = m2 * l1 * l2 * c;
    let d = m2 * l2 * l2;
    let det = a * d - b * b;
    ((d * p1 - b * p2) / det, (a * p2 - b * p1) / det)
}

fn conjugate_momenta(state: &State, params: &Parameters) -> (f64, f64) {
    let Parameters { m1, m2, l1, l2, .. } = *params;
    let c = (state.theta1 - state.theta2).cos();
    let p1 = (m1 + m2) * l1 * l1 * state.omega1 + m2 * l1 * l2 * state.omega2 * c;
    let p2 = m2 * l2 * l2 * state.omega2 + m2 * l1 * l2 * state.omega1 * c;
    (p1, p2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sample_states() -> Vec<State> {
        let mut states = vec![
            State::default(),
            State::at_rest(3.0 * PI / 7.0, 3.0 * PI / 4.0),
            State::new(0.5, 1.0, 0.25, 2.0),
            State::new(-2.0, 7.5, 4.0, -3.25),
            State::new(PI, 0.0, PI, 0.0),
            State::new(1e3, -40.0, -1e3, 55.0),
        ];
        // Deterministic sweep over angle differences, including Δ = ±π/2.
        for i in 0..16 {
            let phase = i as f64 * PI / 8.0;
            states.push(State::new(phase, 0.3 * i as f64, -phase, -0.7));
        }
        states
    }

    fn sample_params() -> Vec<Parameters> {
        vec![
            Parameters::default(),
            Parameters::new(10.0, 1.0, 1.0, 0.5, 0.5).expect("params"),
            Parameters::new(9.81, 2.0, 0.1, 1.2, 0.3).expect("params"),
            Parameters::new(1.0, 1e-3, 50.0, 0.05, 4.0).expect("params"),
        ]
    }

    #[test]
    fn derivative_is_finite_for_finite_states() {
        for params in sample_params() {
            for state in sample_states() {
                let d = derivative(&state, &params);
                assert!(d.is_finite(), "non-finite derivative {d:?} for {state:?}");
            }
        }
    }

    #[test]
    fn derivative_kinematic_rows_copy_velocities() {
        let params = Parameters::default();
        let state = State::new(0.3, -1.25, 1.1, 2.5);
        let d = derivative(&state, &params);
        assert_eq!(d.theta1, -1.25);
        assert_eq!(d.theta2, 2.5);
    }

    #[test]
    fn hanging_equilibrium_has_zero_acceleration() {
        let params = Parameters::default();
        let d = derivative(&State::default(), &params);
        assert_eq!(d, State::default());
    }

    #[test]
    fn aligned_links_reduce_to_compound_swing() {
        // With theta1 = theta2 and zero velocity the coupling terms vanish.
        let params = Parameters::new(10.0, 1.0, 1.0, 0.5, 0.5).expect("params");
        let theta = 0.4;
        let d = derivative(&State::at_rest(theta, theta), &params);
        let expected1 = -params.g * theta.sin() / params.l1;
        assert!((d.omega1 - expected1).abs() < 1e-12);
        assert!(d.omega2.abs() < 1e-12);
    }

    #[test]
    fn double_angle_matches_lagrangian() {
        for params in sample_params() {
            let lagrangian = DoublePendulum::new(params).expect("system");
            let double_angle = lagrangian.with_formulation(Formulation::DoubleAngle);
            for state in sample_states() {
                let x = state.to_array();
                let mut a = [0.0; 4];
                let mut b = [0.0; 4];
                DynamicalSystem::<f64>::apply(&lagrangian, 0.0, &x, &mut a);
                DynamicalSystem::<f64>::apply(&double_angle, 0.0, &x, &mut b);
                for i in 0..4 {
                    let scale = a[i].abs().max(1.0);
                    assert!(
                        (a[i] - b[i]).abs() <= 1e-10 * scale,
                        "component {i} differs for {state:?}: {} vs {}",
                        a[i],
                        b[i]
                    );
                }
            }
        }
    }

    #[test]
    fn hamiltonian_velocities_match_lagrangian_accelerations() {
        // Differentiating p(θ, ω) along the Lagrangian flow must give the Hamiltonian ṗ.
        for params in sample_params().into_iter().take(3) {
            let hamiltonian = DoublePendulum::new(params)
                .expect("system")
                .with_formulation(Formulation::Hamiltonian);
            for state in sample_states().into_iter().take(4) {
                let coords = Formulation::Hamiltonian.to_coordinates(&state, &params);
                let mut out = [0.0; 4];
                hamiltonian.apply(0.0, &coords, &mut out);

                assert!((out[0] - state.omega1).abs() <= 1e-9 * state.omega1.abs().max(1.0));
                assert!((out[2] - state.omega2).abs() <= 1e-9 * state.omega2.abs().max(1.0));

                let h = 1e-6;
                let d = derivative(&state, &params);
                let ahead = State::new(
                    state.theta1 + h * d.theta1,
                    state.omega1 + h * d.omega1,
                    state.theta2 + h * d.theta2,
                    state.omega2 + h * d.omega2,
                );
                let behind = State::new(
                    state.theta1 - h * d.theta1,
                    state.omega1 - h * d.omega1,
                    state.theta2 - h * d.theta2,
                    state.omega2 - h * d.omega2,
                );
                let pa = Formulation::Hamiltonian.to_coordinates(&ahead, &params);
                let pb = Formulation::Hamiltonian.to_coordinates(&behind, &params);
                let dp1 = (pa[1] - pb[1]) / (2.0 * h);
                let dp2 = (pa[3] - pb[3]) / (2.0 * h);
                assert!(
                    (dp1 - out[1]).abs() <= 1e-4 * out[1].abs().max(1.0),
                    "p1' mismatch for {state:?}: {dp1} vs {}",
                    out[1]
                );
                assert!(
                    (dp2 - out[3]).abs() <= 1e-4 * out[3].abs().max(1.0),
                    "p2' mismatch for {state:?}: {dp2} vs {}",
                    out[3]
                );
            }
        }
    }

    #[test]
    fn momentum_coordinates_round_trip() {
        let params = Parameters::new(9.81, 2.0, 0.1, 1.2, 0.3).expect("params");
        let state = State::new(0.7, -1.5, -2.2, 3.0);
        let coords = Formulation::Hamiltonian.to_coordinates(&state, &params);
        let back = Formulation::Hamiltonian.to_state(&coords, &params);
        for (a, b) in state.to_array().iter().zip(back.to_array().iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(
            Formulation::Lagrangian.to_coordinates(&state, &params),
            state.to_array()
        );
    }

    #[test]
    fn evaluates_in_single_precision() {
        let params = Parameters::new(10.0, 1.0, 1.0, 0.5, 0.5).expect("params");
        let system = DoublePendulum::new(params).expect("system");
        let state = State::new(0.5, 1.0, 0.25, 2.0);

        let x64 = state.to_array();
        let x32: Vec<f32> = x64.iter().map(|&v| v as f32).collect();
        let mut out64 = [0.0f64; 4];
        let mut out32 = [0.0f32; 4];
        system.apply(0.0f64, &x64, &mut out64);
        system.apply(0.0f32, &x32, &mut out32);
        for i in 0..4 {
            assert!((out64[i] - out32[i] as f64).abs() < 1e-4 * out64[i].abs().max(1.0));
        }
    }

    #[test]
    fn rejects_invalid_parameters() {
        let params = Parameters {
            m2: 0.0,
            ..Parameters::default()
        };
        assert!(DoublePendulum::new(params).is_err());
    }
}
