//! Mechanical energy of the double pendulum.
//!
//! The potential is measured from the pivot height, so the hanging
//! equilibrium has energy `-(m1 + m2) g l1 - m2 g l2`.

use crate::params::Parameters;
use crate::state::State;

pub fn kinetic_energy(state: &State, params: &Parameters) -> f64 {
    let Parameters { m2, l1, l2, .. } = *params;
    let c = (state.theta1 - state.theta2).cos();
    0.5 * params.total_mass() * l1 * l1 * state.omega1 * state.omega1
        + 0.5 * m2 * l2 * l2 * state.omega2 * state.omega2
        + m2 * l1 * l2 * state.omega1 * state.omega2 * c
}

pub fn potential_energy(state: &State, params: &Parameters) -> f64 {
    let Parameters { g, m2, l1, l2, .. } = *params;
    -params.total_mass() * g * l1 * state.theta1.cos() - m2 * g * l2 * state.theta2.cos()
}

pub fn total_energy(state: &State, params: &Parameters) -> f64 {
    kinetic_energy(state, params) + potential_energy(state, params)
}

/// Largest absolute deviation of the total energy from its value at the first sample.
pub fn max_energy_drift<'a, I>(states: I, params: &Parameters) -> f64
where
    I: IntoIterator<Item = &'a State>,
{
    let mut iter = states.into_iter();
    let Some(first) = iter.next() else {
        return 0.0;
    };
    let e0 = total_energy(first, params);
    iter.map(|s| (total_energy(s, params) - e0).abs())
        .fold(0.0, f64::max)
}
