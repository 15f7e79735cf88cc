use crate::error::{SimulationError, SimulationResult};
use serde::{Deserialize, Serialize};

/// Physical constants of the double pendulum: point masses on massless rigid links.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub g: f64,
    pub m1: f64,
    pub m2: f64,
    pub l1: f64,
    pub l2: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            g: 10.0,
            m1: 0.05,
            m2: 0.05,
            l1: 0.5,
            l2: 0.8,
        }
    }
}

impl Parameters {
    pub fn new(g: f64, m1: f64, m2: f64, l1: f64, l2: f64) -> SimulationResult<Self> {
        let params = Self { g, m1, m2, l1, l2 };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        for (name, value) in [
            ("g", self.g),
            ("m1", self.m1),
            ("m2", self.m2),
            ("l1", self.l1),
            ("l2", self.l2),
        ] {
            require_positive(name, value)?;
        }
        Ok(())
    }

    pub fn total_mass(&self) -> f64 {
        self.m1 + self.m2
    }

    /// Distance from the pivot to the second bob when both links are aligned.
    pub fn reach(&self) -> f64 {
        self.l1 + self.l2
    }
}

/// Absolute and relative error tolerances for the adaptive integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceSpec {
    pub abs_tol: f64,
    pub rel_tol: f64,
}

impl Default for ToleranceSpec {
    fn default() -> Self {
        Self {
            abs_tol: 1e-8,
            rel_tol: 1e-6,
        }
    }
}

impl ToleranceSpec {
    pub fn new(abs_tol: f64, rel_tol: f64) -> SimulationResult<Self> {
        let tol = Self { abs_tol, rel_tol };
        tol.validate()?;
        Ok(tol)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        require_positive("abs_tol", self.abs_tol)?;
        require_positive("rel_tol", self.rel_tol)
    }

    /// Returns both tolerances divided by `factor`.
    pub fn tightened(&self, factor: f64) -> Self {
        Self {
            abs_tol: self.abs_tol / factor,
            rel_tol: self.rel_tol / factor,
        }
    }

    /// Per-component error scale `abs_tol + rel_tol * max(|y0|, |y1|)`.
    #[inline]
    pub fn scale(&self, y0: f64, y1: f64) -> f64 {
        self.abs_tol + self.rel_tol * y0.abs().max(y1.abs())
    }
}

fn require_positive(name: &str, value: f64) -> SimulationResult<()> {
    if !value.is_finite() {
        return Err(SimulationError::InvalidParameters(format!(
            "{name} must be finite, got {value}"
        )));
    }
    if value <= 0.0 {
        return Err(SimulationError::InvalidParameters(format!(
            "{name} must be positive, got {value}"
        )));
    }
    Ok(())
}
