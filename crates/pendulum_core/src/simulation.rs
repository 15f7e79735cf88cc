//! End-to-end runs: configuration in, state and Cartesian trajectories out.

use crate::dynamics::{DoublePendulum, Formulation};
use crate::error::{SimulationError, SimulationResult};
use crate::grid::OutputGrid;
use crate::integrator::{CancellationToken, IntegrationStats, Integrator, IntegratorSettings};
use crate::kinematics::{to_cartesian, CartesianTrajectory};
use crate::params::Parameters;
use crate::state::{Sample, State, Trajectory};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything needed to reproduce one run.
///
/// Every field has a default, so a partial JSON object such as
/// `{"parameters": {"m2": 1.0}}` is a complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub parameters: Parameters,
    pub initial_state: State,
    pub start_time: f64,
    pub stop_time: f64,
    pub num_points: usize,
    pub formulation: Formulation,
    pub integrator: IntegratorSettings,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            parameters: Parameters::default(),
            initial_state: State::new(0.5, 1.0, 0.25, 2.0),
            start_time: 0.0,
            stop_time: 10.0,
            num_points: 250,
            formulation: Formulation::default(),
            integrator: IntegratorSettings::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json(json: &str) -> SimulationResult<Self> {
        serde_json::from_str(json).map_err(|err| SimulationError::InvalidConfig(err.to_string()))
    }

    pub fn to_json(&self) -> SimulationResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| SimulationError::InvalidConfig(err.to_string()))
    }

    pub fn grid(&self) -> SimulationResult<OutputGrid> {
        OutputGrid::uniform(self.start_time, self.stop_time, self.num_points)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    pub parameters: Parameters,
    pub trajectory: Trajectory,
    pub cartesian: CartesianTrajectory,
    pub stats: IntegrationStats,
}

pub fn simulate(config: &SimulationConfig) -> SimulationResult<Simulation> {
    run(config, None)
}

/// Like [`simulate`], but stops with [`SimulationError::Cancelled`] once
/// `token` is cancelled.
pub fn simulate_with_cancellation(
    config: &SimulationConfig,
    token: &CancellationToken,
) -> SimulationResult<Simulation> {
    run(config, Some(token.clone()))
}

/// Runs independent configurations, in parallel when the `parallel` feature
/// is enabled. Results are returned in input order.
#[cfg(feature = "parallel")]
pub fn simulate_batch(configs: &[SimulationConfig]) -> Vec<SimulationResult<Simulation>> {
    use rayon::prelude::*;
    configs.par_iter().map(simulate).collect()
}

#[cfg(not(feature = "parallel"))]
pub fn simulate_batch(configs: &[SimulationConfig]) -> Vec<SimulationResult<Simulation>> {
    configs.iter().map(simulate).collect()
}

fn run(
    config: &SimulationConfig,
    token: Option<CancellationToken>,
) -> SimulationResult<Simulation> {
    let system = DoublePendulum::new(config.parameters)?.with_formulation(config.formulation);
    let params = *system.params();
    let formulation = system.formulation();
    let grid = config.grid()?;
    let mut integrator = Integrator::new(config.integrator)?;
    if let Some(token) = token {
        integrator = integrator.with_cancellation(token);
    }

    debug!(
        ?formulation,
        theta1 = config.initial_state.theta1,
        theta2 = config.initial_state.theta2,
        "Simulating double pendulum"
    );

    let y0 = formulation.to_coordinates(&config.initial_state, &params);
    let solution = integrator.integrate(&system, config.start_time, &y0, &grid)?;

    let samples = solution
        .iter()
        .map(|(t, coords)| Sample {
            t,
            state: formulation.to_state(coords, &params),
        })
        .collect();
    let trajectory = Trajectory::new(samples);
    let cartesian = to_cartesian(&trajectory, &params);

    Ok(Simulation {
        parameters: params,
        trajectory,
        cartesian,
        stats: solution.stats,
    })
}
