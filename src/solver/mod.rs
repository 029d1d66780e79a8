//! MNA (Modified Nodal Analysis) solver engine.
//!
//! This module provides the numerical engine for circuit analysis.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = z where:
//! - x contains node voltages and branch currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G is the conductance matrix (node equations)
//! - B, C couple voltage-defined branches to nodes
//! - D carries the branch self-terms (companion resistances, jwL)
//! - v is the vector of node voltages
//! - j is the vector of branch currents
//! - i is the sum of current sources into each node
//! - e is the vector of branch voltage constraints

mod ac;
mod mna;
mod newton;
mod probe;
mod simulator;
mod stamp;
mod transient;

pub use ac::{frequency_grid, FrequencyResponse};
pub use mna::{MnaMatrix, Scalar};
pub use newton::NewtonRaphson;
pub use probe::{Probe, ProbeTarget};
pub use simulator::{Simulator, SimulatorConfig};
pub use stamp::RealMode;
pub use transient::Waveforms;

/// Maximum Newton-Raphson iterations per solve.
pub const MAX_ITERATIONS: usize = 100;

/// Absolute convergence tolerance for Newton-Raphson iteration.
pub const ABS_TOLERANCE: f64 = 1e-9;

/// Relative convergence tolerance for Newton-Raphson iteration.
pub const REL_TOLERANCE: f64 = 1e-6;

/// Relative pivot threshold: a pivot below this fraction of the matrix
/// infinity norm is treated as singular.
pub const PIVOT_EPSILON: f64 = 1e-14;

/// Steps taken by `transient_simulation` when no time step is given:
/// the span divided by this count.
pub const DEFAULT_STEP_COUNT: f64 = 1000.0;
