//! Browser-facing wrapper around a single pendulum configuration.

use anyhow::{bail, Context};
use js_sys::Float64Array;
use pendulum_core::dynamics::DoublePendulum;
use pendulum_core::energy::{max_energy_drift, total_energy};
use pendulum_core::kinematics::link_positions;
use pendulum_core::simulation::{simulate, Simulation, SimulationConfig};
use pendulum_core::state::State;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmPendulum {
    pub(crate) config: SimulationConfig,
    last_run: Option<Simulation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct RunSummary {
    accepted_steps: usize,
    rejected_steps: usize,
    evaluations: u64,
    energy_drift: f64,
}

impl RunSummary {
    fn of(simulation: &Simulation) -> Self {
        Self {
            accepted_steps: simulation.stats.accepted_steps,
            rejected_steps: simulation.stats.rejected_steps,
            evaluations: simulation.stats.evaluations,
            energy_drift: max_energy_drift(
                simulation.trajectory.iter().map(|sample| &sample.state),
                &simulation.parameters,
            ),
        }
    }
}

pub(crate) fn state_from_slice(values: &[f64]) -> anyhow::Result<State> {
    if values.len() != 4 {
        bail!(
            "State must have 4 components (theta1, omega1, theta2, omega2), got {}.",
            values.len()
        );
    }
    Ok(State::from_slice(values))
}

pub(crate) fn flatten_rows(rows: impl Iterator<Item = [f64; 5]>) -> Vec<f64> {
    rows.flat_map(|row| row.into_iter()).collect()
}

pub(crate) fn run_config(config: &SimulationConfig) -> anyhow::Result<Simulation> {
    simulate(config).context("Simulation failed")
}

fn to_js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}

impl WasmPendulum {
    pub(crate) fn from_config(config: SimulationConfig) -> anyhow::Result<Self> {
        config
            .parameters
            .validate()
            .context("Invalid pendulum parameters")?;
        config.integrator.validate().context("Invalid integrator settings")?;
        config.grid().context("Invalid output grid")?;
        Ok(Self {
            config,
            last_run: None,
        })
    }

    pub(crate) fn run(&mut self) -> anyhow::Result<&Simulation> {
        let simulation = run_config(&self.config)?;
        Ok(&*self.last_run.insert(simulation))
    }

    fn latest(&mut self) -> anyhow::Result<&Simulation> {
        if self.last_run.is_none() {
            return self.run();
        }
        self.last_run
            .as_ref()
            .context("No simulation result available")
    }

    pub(crate) fn trajectory_buffer(&mut self) -> anyhow::Result<Vec<f64>> {
        Ok(flatten_rows(self.latest()?.trajectory.rows()))
    }

    pub(crate) fn position_buffer(&mut self) -> anyhow::Result<Vec<f64>> {
        Ok(flatten_rows(self.latest()?.cartesian.rows()))
    }

    pub(crate) fn summary(&mut self) -> anyhow::Result<RunSummary> {
        Ok(RunSummary::of(self.latest()?))
    }
}

#[wasm_bindgen]
impl WasmPendulum {
    /// Builds a pendulum from a (possibly partial) configuration object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<WasmPendulum, JsValue> {
        #[cfg(target_arch = "wasm32")]
        console_error_panic_hook::set_once();

        let config: SimulationConfig = if config.is_undefined() || config.is_null() {
            SimulationConfig::default()
        } else {
            from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Invalid configuration: {e}")))?
        };
        Self::from_config(config).map_err(to_js_error)
    }

    pub fn from_json(json: &str) -> Result<WasmPendulum, JsValue> {
        let config = SimulationConfig::from_json(json)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Self::from_config(config).map_err(to_js_error)
    }

    pub fn set_initial_state(&mut self, state: &[f64]) -> Result<(), JsValue> {
        self.config.initial_state = state_from_slice(state).map_err(to_js_error)?;
        self.last_run = None;
        Ok(())
    }

    pub fn get_initial_state(&self) -> Vec<f64> {
        self.config.initial_state.to_array().to_vec()
    }

    pub fn set_time_span(
        &mut self,
        start_time: f64,
        stop_time: f64,
        num_points: usize,
    ) -> Result<(), JsValue> {
        let mut config = self.config.clone();
        config.start_time = start_time;
        config.stop_time = stop_time;
        config.num_points = num_points;
        config.grid().map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.config = config;
        self.last_run = None;
        Ok(())
    }

    /// Runs the configuration and returns the serialized result.
    pub fn simulate(&mut self) -> Result<JsValue, JsValue> {
        let simulation = self.run().map_err(to_js_error)?;
        to_value(simulation)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Rows of `[t, theta1, omega1, theta2, omega2]`, flattened.
    pub fn trajectory_rows(&mut self) -> Result<Float64Array, JsValue> {
        let buffer = self.trajectory_buffer().map_err(to_js_error)?;
        Ok(Float64Array::from(buffer.as_slice()))
    }

    /// Rows of `[t, x1, y1, x2, y2]`, flattened, for animation.
    pub fn position_rows(&mut self) -> Result<Float64Array, JsValue> {
        let buffer = self.position_buffer().map_err(to_js_error)?;
        Ok(Float64Array::from(buffer.as_slice()))
    }

    /// Step counts and energy drift of the latest run.
    pub fn run_summary(&mut self) -> Result<JsValue, JsValue> {
        let summary = self.summary().map_err(to_js_error)?;
        to_value(&summary).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn derivative(&self, state: &[f64]) -> Result<Vec<f64>, JsValue> {
        let state = state_from_slice(state).map_err(to_js_error)?;
        let system = DoublePendulum::new(self.config.parameters)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(system.derivative(&state).to_array().to_vec())
    }

    /// `[x1, y1, x2, y2]` for a single state.
    pub fn positions(&self, state: &[f64]) -> Result<Vec<f64>, JsValue> {
        let state = state_from_slice(state).map_err(to_js_error)?;
        let ((x1, y1), (x2, y2)) = link_positions(&state, &self.config.parameters);
        Ok(vec![x1, y1, x2, y2])
    }

    pub fn energy(&self, state: &[f64]) -> Result<f64, JsValue> {
        let state = state_from_slice(state).map_err(to_js_error)?;
        Ok(total_energy(&state, &self.config.parameters))
    }

    /// Largest distance of the outer bob from the pivot, for sizing the view.
    pub fn reach(&self) -> f64 {
        self.config.parameters.reach()
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::WasmPendulum;
    use pendulum_core::simulation::SimulationConfig;
    use serde_wasm_bindgen::to_value;
    use wasm_bindgen::JsValue;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn constructor_accepts_partial_object() {
        let config = to_value(&SimulationConfig {
            num_points: 5,
            ..SimulationConfig::default()
        })
        .expect("config");
        let mut pendulum = WasmPendulum::new(config).expect("pendulum");
        let rows = pendulum.position_rows().expect("rows");
        assert_eq!(rows.length(), 25);
    }

    #[wasm_bindgen_test]
    fn constructor_rejects_malformed_object() {
        let result = WasmPendulum::new(JsValue::from_str("not a config"));
        assert!(result.is_err());
    }

    #[wasm_bindgen_test]
    fn undefined_config_uses_defaults_and_rejects_short_state() {
        let mut pendulum = WasmPendulum::new(JsValue::UNDEFINED).expect("pendulum");
        assert_eq!(pendulum.get_initial_state(), vec![0.5, 1.0, 0.25, 2.0]);
        assert!(pendulum.set_initial_state(&[1.0]).is_err());
    }

    #[wasm_bindgen_test]
    fn summary_and_trajectory_rows_serialize() {
        let mut pendulum = WasmPendulum::from_json(r#"{"stop_time": 1.0, "num_points": 3}"#)
            .expect("pendulum");
        let rows = pendulum.trajectory_rows().expect("rows");
        assert_eq!(rows.length(), 15);
        assert!(pendulum.run_summary().expect("summary").is_object());
        assert!(pendulum.simulate().expect("simulation").is_object());
    }
}
