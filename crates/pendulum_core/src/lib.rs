/// The `pendulum_core` crate simulates the planar double pendulum.
/// It pairs closed-form equations of motion with embedded Runge-Kutta
/// integrators under adaptive step-size control.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction), `DynamicalSystem` (vector fields).
/// - **Dynamics**: the pendulum vector field in Lagrangian, double-angle and Hamiltonian form.
/// - **Solvers**: Tsitouras and Dormand-Prince 5(4) pairs with FSAL stage reuse.
/// - **Controller / Integrator**: error-normed step acceptance and grid-aligned integration.
/// - **Kinematics**: Cartesian bob positions for plotting and animation.
/// - **Simulation**: serde-configurable end-to-end runs, optionally in parallel.
pub mod controller;
pub mod dynamics;
pub mod energy;
pub mod error;
pub mod grid;
pub mod integrator;
pub mod kinematics;
pub mod params;
pub mod simulation;
pub mod solvers;
pub mod state;
pub mod traits;

pub use error::{SimulationError, SimulationResult};
pub use simulation::{simulate, simulate_batch, Simulation, SimulationConfig};
