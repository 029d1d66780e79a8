//! Newton-Raphson iteration for nonlinear circuits.

use crate::circuit::Circuit;
use crate::error::{NodalError, Result};

use super::mna::MnaMatrix;
use super::stamp::{stamp_real_system, RealMode};
use super::{ABS_TOLERANCE, MAX_ITERATIONS, REL_TOLERANCE};

/// Newton-Raphson driver wrapping the equation builder and LU solver.
pub struct NewtonRaphson {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute convergence tolerance
    pub abs_tolerance: f64,
    /// Relative convergence tolerance
    pub rel_tolerance: f64,
    /// Previous iterate, kept for the convergence check
    x_prev: Vec<f64>,
}

impl Default for NewtonRaphson {
    fn default() -> Self {
        Self::new()
    }
}

impl NewtonRaphson {
    /// Create a driver with the default tolerances.
    pub fn new() -> Self {
        Self::with_config(MAX_ITERATIONS, ABS_TOLERANCE, REL_TOLERANCE)
    }

    /// Create a driver with explicit limits.
    pub fn with_config(max_iterations: usize, abs_tolerance: f64, rel_tolerance: f64) -> Self {
        Self {
            max_iterations,
            abs_tolerance,
            rel_tolerance,
            x_prev: Vec::new(),
        }
    }

    /// Solve the circuit equations for the given mode, starting from the
    /// guess held in `matrix.x`. Returns the number of iterations used.
    pub fn solve(
        &mut self,
        circuit: &Circuit,
        matrix: &mut MnaMatrix<f64>,
        mode: RealMode,
    ) -> Result<usize> {
        if !circuit.has_nonlinear() {
            // Purely linear system: a single factor/solve suffices
            matrix.clear();
            stamp_real_system(circuit, matrix, mode);
            matrix.factor()?;
            matrix.solve()?;
            return Ok(1);
        }

        if self.x_prev.len() != matrix.size {
            self.x_prev = vec![0.0; matrix.size];
        }

        let mut update = f64::INFINITY;
        for iter in 0..self.max_iterations {
            self.x_prev.copy_from_slice(&matrix.x);

            // Rebuild the linearization about the current iterate
            matrix.clear();
            stamp_real_system(circuit, matrix, mode);
            matrix.factor()?;
            matrix.solve()?;

            update = 0.0f64;
            let mut norm = 0.0f64;
            for i in 0..matrix.size {
                update = update.max((matrix.x[i] - self.x_prev[i]).abs());
                norm = norm.max(matrix.x[i].abs());
            }

            if update <= self.abs_tolerance + self.rel_tolerance * norm {
                return Ok(iter + 1);
            }
        }

        Err(NodalError::NewtonDidNotConverge {
            iterations: self.max_iterations,
            residual: update,
        })
    }
}
