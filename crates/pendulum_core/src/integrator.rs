//! Adaptive integration onto a requested output grid.
//!
//! The driver advances an [`EmbeddedRk`] pair through [`ErrorControl`],
//! clipping any step that would pass the next output time so that it lands
//! on it exactly. After a clipped landing the step proposal from before the
//! clip is restored, so closely spaced outputs do not throttle the
//! controller. All arithmetic happens in a fixed order; the same inputs
//! always reproduce the same samples bit for bit.

use crate::controller::{ErrorControl, ErrorNorm, StepController};
use crate::error::{SimulationError, SimulationResult};
use crate::grid::OutputGrid;
use crate::params::ToleranceSpec;
use crate::solvers::{EmbeddedRk, Method, ORDER};
use crate::traits::DynamicalSystem;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Steps within this factor of the distance to the next output time are
/// stretched to land on it rather than leaving a sliver.
const LANDING_SLACK: f64 = 1.01;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorSettings {
    pub method: Method,
    pub tolerance: ToleranceSpec,
    pub controller: StepController,
    pub norm: ErrorNorm,
    /// First trial step; chosen automatically when absent.
    pub initial_step: Option<f64>,
    /// Smallest admissible step; defaults to a few ulps of the interval.
    pub min_step: Option<f64>,
    pub max_step: Option<f64>,
    /// Accepted-step budget for the whole run.
    pub max_steps: Option<usize>,
}

impl IntegratorSettings {
    pub fn with_tolerance(mut self, abs_tol: f64, rel_tol: f64) -> Self {
        self.tolerance = ToleranceSpec { abs_tol, rel_tol };
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn validate(&self) -> SimulationResult<()> {
        self.tolerance.validate()?;
        self.controller.validate()?;
        for (name, value) in [
            ("initial_step", self.initial_step),
            ("min_step", self.min_step),
            ("max_step", self.max_step),
        ] {
            if let Some(v) = value {
                if !(v.is_finite() && v > 0.0) {
                    return Err(SimulationError::InvalidParameters(format!(
                        "{name} must be positive and finite, got {v}"
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_step, self.max_step) {
            if min > max {
                return Err(SimulationError::InvalidParameters(format!(
                    "min_step {min} exceeds max_step {max}"
                )));
            }
        }
        if self.max_steps == Some(0) {
            return Err(SimulationError::InvalidParameters(
                "max_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cooperative cancellation flag shared between a caller and running integrations.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub evaluations: u64,
}

/// Samples of one run, stored row-major: `states[i * dimension..(i + 1) * dimension]`
/// is the state at `times[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub dimension: usize,
    pub times: Vec<f64>,
    pub states: Vec<f64>,
    pub stats: IntegrationStats,
}

impl Solution {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn state(&self, index: usize) -> &[f64] {
        &self.states[index * self.dimension..(index + 1) * self.dimension]
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &[f64])> + '_ {
        self.times
            .iter()
            .copied()
            .zip(self.states.chunks_exact(self.dimension))
    }
}

pub struct Integrator {
    settings: IntegratorSettings,
    cancellation: Option<CancellationToken>,
}

impl Integrator {
    pub fn new(settings: IntegratorSettings) -> SimulationResult<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            cancellation: None,
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Integrates from `(t0, y0)` and records the state at every grid time.
    ///
    /// The result starts with the sample at `t0`, followed by one sample per
    /// grid time after `t0`. Grid times must not precede `t0`. Any failure
    /// discards the samples gathered so far.
    ///
    /// Near a finite-time singularity the relative part of the tolerance
    /// grows with the state, so the time carried by a numerical failure can
    /// lie slightly past the singularity.
    pub fn integrate<S: DynamicalSystem<f64>>(
        &self,
        system: &S,
        t0: f64,
        y0: &[f64],
        grid: &OutputGrid,
    ) -> SimulationResult<Solution> {
        debug!(
            t0,
            t_stop = grid.last(),
            points = grid.len(),
            method = ?self.settings.method,
            "Starting integration"
        );
        let result = self.run(system, t0, y0, grid);
        match &result {
            Ok(solution) => debug!(
                accepted = solution.stats.accepted_steps,
                rejected = solution.stats.rejected_steps,
                evaluations = solution.stats.evaluations,
                "Integration finished"
            ),
            Err(err) if err.is_numerical() => warn!(error = %err, "Integration failed"),
            Err(err) => debug!(error = %err, "Integration stopped"),
        }
        result
    }

    fn run<S: DynamicalSystem<f64>>(
        &self,
        system: &S,
        t0: f64,
        y0: &[f64],
        grid: &OutputGrid,
    ) -> SimulationResult<Solution> {
        let dim = system.dimension();
        if y0.len() != dim {
            return Err(SimulationError::InvalidParameters(format!(
                "initial state has dimension {}, system expects {}",
                y0.len(),
                dim
            )));
        }
        if !t0.is_finite() {
            return Err(SimulationError::InvalidGrid(format!(
                "initial time must be finite, got {t0}"
            )));
        }
        if let Some(bad) = y0.iter().find(|v| !v.is_finite()) {
            return Err(SimulationError::InvalidParameters(format!(
                "initial state must be finite, got {bad}"
            )));
        }
        if grid.first() < t0 {
            return Err(SimulationError::InvalidGrid(format!(
                "first output time {} precedes initial time {}",
                grid.first(),
                t0
            )));
        }

        let t_end = grid.last();
        let settings = &self.settings;
        let control = ErrorControl {
            controller: settings.controller,
            tolerance: settings.tolerance,
            norm: settings.norm,
            min_step: settings
                .min_step
                .unwrap_or_else(|| 16.0 * f64::EPSILON * t0.abs().max(t_end.abs()).max(1.0)),
        };
        let max_step = settings.max_step.unwrap_or(f64::INFINITY);

        let targets: Vec<f64> = grid.times().iter().copied().filter(|&t| t > t0).collect();
        let mut times = Vec::with_capacity(targets.len() + 1);
        let mut states = Vec::with_capacity((targets.len() + 1) * dim);
        times.push(t0);
        states.extend_from_slice(y0);

        let mut stepper = EmbeddedRk::new(settings.method, dim);
        stepper.prime(system, t0, y0);
        if stepper.derivative().iter().any(|v| !v.is_finite()) {
            return Err(SimulationError::NonFiniteState { t: t0 });
        }

        let mut stats = IntegrationStats::default();
        let mut extra_evaluations = 0u64;
        if targets.is_empty() {
            stats.evaluations = stepper.evaluations();
            return Ok(Solution {
                dimension: dim,
                times,
                states,
                stats,
            });
        }

        let mut h = match settings.initial_step {
            Some(h) => h,
            None => initial_step_guess(
                system,
                t0,
                y0,
                stepper.derivative(),
                &settings.tolerance,
                settings.norm,
                t_end - t0,
                &mut extra_evaluations,
            ),
        }
        .min(max_step)
        .min(t_end - t0);

        let mut t = t0;
        let mut y = y0.to_vec();
        let mut y_new = vec![0.0; dim];

        for &target in &targets {
            while t < target {
                if self
                    .cancellation
                    .as_ref()
                    .is_some_and(CancellationToken::is_cancelled)
                {
                    return Err(SimulationError::Cancelled { t });
                }
                if let Some(max_steps) = settings.max_steps {
                    if stats.accepted_steps >= max_steps {
                        return Err(SimulationError::StepBudgetExceeded { t, max_steps });
                    }
                }

                let remaining = target - t;
                let landing = h * LANDING_SLACK >= remaining;
                let trial = if landing { remaining } else { h };

                let outcome = control.advance(&mut stepper, system, t, &y, trial, &mut y_new)?;
                stats.rejected_steps += outcome.rejections;
                stats.accepted_steps += 1;

                let landed = landing && outcome.rejections == 0;
                t = if landed { target } else { t + outcome.h };
                std::mem::swap(&mut y, &mut y_new);
                stepper.accept();

                h = if landed {
                    outcome.h_next.max(h)
                } else {
                    outcome.h_next
                }
                .min(max_step);
            }
            times.push(t);
            states.extend_from_slice(&y);
        }

        stats.evaluations = stepper.evaluations() + extra_evaluations;
        Ok(Solution {
            dimension: dim,
            times,
            states,
            stats,
        })
    }
}

/// Starting step from the size of the state, its derivative, and a one-step
/// estimate of the second derivative (Hairer, Nørsett and Wanner, II.4).
#[allow(clippy::too_many_arguments)]
fn initial_step_guess<S: DynamicalSystem<f64>>(
    system: &S,
    t0: f64,
    y0: &[f64],
    f0: &[f64],
    tol: &ToleranceSpec,
    norm: ErrorNorm,
    span: f64,
    evaluations: &mut u64,
) -> f64 {
    let dim = y0.len();
    let d0 = norm.measure(tol, y0, y0, y0);
    let d1 = norm.measure(tol, y0, y0, f0);

    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    }
    .min(span);

    let y1: Vec<f64> = (0..dim).map(|i| y0[i] + h0 * f0[i]).collect();
    let mut f1 = vec![0.0; dim];
    system.apply(t0 + h0, &y1, &mut f1);
    *evaluations += 1;

    let diff: Vec<f64> = (0..dim).map(|i| f1[i] - f0[i]).collect();
    let d2 = norm.measure(tol, y0, y0, &diff) / h0;

    let largest = d1.max(d2);
    let h1 = if !largest.is_finite() {
        h0 * 1e-3
    } else if largest <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / largest).powf(1.0 / f64::from(ORDER))
    };

    (100.0 * h0).min(h1).min(span)
}
