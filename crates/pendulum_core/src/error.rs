//! Error types for pendulum integration runs.

use thiserror::Error;

/// Errors that can end a simulation run.
///
/// Validation errors are raised before any integration work starts; the
/// numerical variants carry the time at which the run stopped. No variant is
/// accompanied by a partial trajectory.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// A mass, length, gravity or tolerance is non-positive or non-finite.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The output grid is empty, unordered, or starts before the initial time.
    #[error("Invalid output grid: {0}")]
    InvalidGrid(String),

    /// A configuration document could not be parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The controller had to shrink the step below the admissible minimum.
    #[error("Step size underflow at t = {t}: h = {h:e} fell below minimum {min_step:e}")]
    StepSizeUnderflow { t: f64, h: f64, min_step: f64 },

    /// The state became NaN or infinite; `t` is the time of the last valid state.
    #[error("Non-finite state after t = {t}")]
    NonFiniteState { t: f64 },

    /// The caller-supplied accepted-step budget ran out.
    #[error("Step budget of {max_steps} accepted steps exhausted at t = {t}")]
    StepBudgetExceeded { t: f64, max_steps: usize },

    /// A cancellation request was observed between substeps.
    #[error("Integration cancelled at t = {t}")]
    Cancelled { t: f64 },
}

impl SimulationError {
    /// True for failures raised by the integrator itself rather than by
    /// input validation or cancellation.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            SimulationError::StepSizeUnderflow { .. }
                | SimulationError::NonFiniteState { .. }
                | SimulationError::StepBudgetExceeded { .. }
        )
    }
}

/// Result type for simulation operations.
pub type SimulationResult<T> = std::result::Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_include_context() {
        let err = SimulationError::InvalidParameters("m1 must be positive".to_string());
        assert_eq!(format!("{err}"), "Invalid parameters: m1 must be positive");

        let err = SimulationError::StepSizeUnderflow {
            t: 1.5,
            h: 1e-18,
            min_step: 1e-15,
        };
        let message = format!("{err}");
        assert!(message.contains("t = 1.5"));
        assert!(message.contains("1e-18"));
    }

    #[test]
    fn numerical_classification() {
        assert!(SimulationError::NonFiniteState { t: 0.0 }.is_numerical());
        assert!(SimulationError::StepBudgetExceeded { t: 0.0, max_steps: 1 }.is_numerical());
        assert!(!SimulationError::Cancelled { t: 0.0 }.is_numerical());
        assert!(!SimulationError::InvalidGrid("empty".to_string()).is_numerical());
    }
}
