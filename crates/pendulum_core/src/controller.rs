//! Step acceptance and step-size selection for embedded Runge-Kutta pairs.

use crate::error::{SimulationError, SimulationResult};
use crate::params::ToleranceSpec;
use crate::solvers::{EmbeddedRk, ERROR_ORDER};
use crate::traits::DynamicalSystem;
use serde::{Deserialize, Serialize};

/// Step-size update factors.
///
/// Accepted steps grow by `min(growth_cap, safety * err^(-1/(q+1)))`, rejected
/// steps shrink by `max(shrink_floor, safety * err^(-1/q))`, where `q` is the
/// order of the embedded error estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepController {
    pub safety: f64,
    pub growth_cap: f64,
    pub shrink_floor: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            growth_cap: 5.0,
            shrink_floor: 0.1,
        }
    }
}

impl StepController {
    pub fn validate(&self) -> SimulationResult<()> {
        if !(self.safety > 0.0 && self.safety <= 1.0) {
            return Err(SimulationError::InvalidParameters(format!(
                "safety must lie in (0, 1], got {}",
                self.safety
            )));
        }
        if !(self.growth_cap >= 1.0 && self.growth_cap.is_finite()) {
            return Err(SimulationError::InvalidParameters(format!(
                "growth_cap must be finite and at least 1, got {}",
                self.growth_cap
            )));
        }
        if !(self.shrink_floor > 0.0 && self.shrink_floor < 1.0) {
            return Err(SimulationError::InvalidParameters(format!(
                "shrink_floor must lie in (0, 1), got {}",
                self.shrink_floor
            )));
        }
        Ok(())
    }

    /// Next step after an accepted step with normalized error `err <= 1`.
    pub fn grow(&self, h: f64, err: f64) -> f64 {
        if err <= 0.0 {
            return h * self.growth_cap;
        }
        let factor = self.safety * err.powf(-1.0 / f64::from(ERROR_ORDER + 1));
        h * factor.min(self.growth_cap)
    }

    /// Retry step after a rejection; non-finite errors shrink by the floor.
    pub fn shrink(&self, h: f64, err: f64) -> f64 {
        if !err.is_finite() {
            return h * self.shrink_floor;
        }
        let factor = self.safety * err.powf(-1.0 / f64::from(ERROR_ORDER));
        h * factor.max(self.shrink_floor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorNorm {
    /// Root-mean-square of the scaled components.
    #[default]
    Rms,
    /// Largest scaled component.
    Max,
}

impl ErrorNorm {
    /// Normalized error of a trial step: each component of `err` is divided by
    /// `abs_tol + rel_tol * max(|y|, |y_new|)` before taking the norm.
    /// Returns infinity when the trial state or error is not finite.
    pub fn measure(self, tol: &ToleranceSpec, y: &[f64], y_new: &[f64], err: &[f64]) -> f64 {
        let mut accum = 0.0f64;
        for n in 0..y.len() {
            if !y_new[n].is_finite() || !err[n].is_finite() {
                return f64::INFINITY;
            }
            let scaled = err[n] / tol.scale(y[n], y_new[n]);
            match self {
                ErrorNorm::Rms => accum += scaled * scaled,
                ErrorNorm::Max => accum = accum.max(scaled.abs()),
            }
        }
        match self {
            ErrorNorm::Rms if !y.is_empty() => (accum / y.len() as f64).sqrt(),
            _ => accum,
        }
    }
}

/// An accepted step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Step size actually taken.
    pub h: f64,
    /// Proposal for the following step.
    pub h_next: f64,
    /// Normalized error of the accepted attempt.
    pub error: f64,
    /// Attempts rejected before this one was accepted.
    pub rejections: usize,
}

/// Tolerances, update factors and the step-size floor of one run.
#[derive(Debug, Clone, Copy)]
pub struct ErrorControl {
    pub controller: StepController,
    pub tolerance: ToleranceSpec,
    pub norm: ErrorNorm,
    pub min_step: f64,
}

impl ErrorControl {
    /// Attempts steps from `(t, y)` starting with `h`, shrinking after each
    /// rejection until one is accepted. The accepted state is written to
    /// `y_new`; `y` and the stepper's first stage are left untouched, so the
    /// caller commits the step with [`EmbeddedRk::accept`].
    pub fn advance(
        &self,
        stepper: &mut EmbeddedRk,
        system: &impl DynamicalSystem<f64>,
        t: f64,
        y: &[f64],
        h: f64,
        y_new: &mut [f64],
    ) -> SimulationResult<StepOutcome> {
        let mut h = h;
        let mut rejections = 0usize;

        loop {
            stepper.attempt(system, t, y, h, y_new);
            let error = self
                .norm
                .measure(&self.tolerance, y, y_new, stepper.local_error());

            if error <= 1.0 {
                return Ok(StepOutcome {
                    h,
                    h_next: self.controller.grow(h, error),
                    error,
                    rejections,
                });
            }

            rejections += 1;
            let retry = self.controller.shrink(h, error);
            if retry < self.min_step {
                if error.is_infinite() {
                    return Err(SimulationError::NonFiniteState { t });
                }
                return Err(SimulationError::StepSizeUnderflow {
                    t,
                    h: retry,
                    min_step: self.min_step,
                });
            }
            h = retry;
        }
    }
}
