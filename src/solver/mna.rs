//! MNA matrix storage and the dense LU solver.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use num_complex::Complex;
use num_traits::{One, Zero};

use crate::error::{NodalError, Result};

use super::PIVOT_EPSILON;

/// Scalar element type of an MNA system: `f64` for DC and transient
/// analysis, `Complex<f64>` for the AC sweep.
pub trait Scalar:
    Copy
    + PartialEq
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + std::fmt::Debug
{
    /// Magnitude used for pivot selection.
    fn magnitude(self) -> f64;

    /// Lift a real value into the scalar type.
    fn from_real(value: f64) -> Self;
}

impl Scalar for f64 {
    fn magnitude(self) -> f64 {
        self.abs()
    }

    fn from_real(value: f64) -> Self {
        value
    }
}

impl Scalar for Complex<f64> {
    fn magnitude(self) -> f64 {
        self.norm()
    }

    fn from_real(value: f64) -> Self {
        Complex::new(value, 0.0)
    }
}

/// MNA system Ax = z over a scalar type T.
#[derive(Debug)]
pub struct MnaMatrix<T: Scalar> {
    /// System matrix A (row-major)
    pub a: Vec<T>,
    /// Source vector z
    pub z: Vec<T>,
    /// Solution vector x
    pub x: Vec<T>,
    /// Matrix dimension
    pub size: usize,
    /// LU decomposition of A
    lu: Vec<T>,
    /// Pivot indices for the LU decomposition
    pivots: Vec<usize>,
}

impl<T: Scalar> MnaMatrix<T> {
    /// Create a new MNA system of the given dimension.
    pub fn new(size: usize) -> Self {
        Self {
            a: vec![T::zero(); size * size],
            z: vec![T::zero(); size],
            x: vec![T::zero(); size],
            size,
            lu: vec![T::zero(); size * size],
            pivots: vec![0; size],
        }
    }

    /// Clear the matrix and source vector to zero.
    pub fn clear(&mut self) {
        self.a.fill(T::zero());
        self.z.fill(T::zero());
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> T {
        self.a[row * self.size + col]
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: T) {
        self.a[row * self.size + col] += value;
    }

    /// Add to source vector element.
    pub fn add_source(&mut self, row: usize, value: T) {
        self.z[row] += value;
    }

    /// Stamp a conductance between two nodes.
    /// For a conductance G between nodes n1 and n2:
    ///   A[n1,n1] += G
    ///   A[n2,n2] += G
    ///   A[n1,n2] -= G
    ///   A[n2,n1] -= G
    pub fn stamp_conductance(&mut self, n1: Option<usize>, n2: Option<usize>, g: T) {
        if let Some(i) = n1 {
            self.add(i, i, g);
        }
        if let Some(j) = n2 {
            self.add(j, j, g);
        }
        if let (Some(i), Some(j)) = (n1, n2) {
            self.add(i, j, -g);
            self.add(j, i, -g);
        }
    }

    /// Stamp a current source driving current from n1 into n2.
    pub fn stamp_current_source(&mut self, n1: Option<usize>, n2: Option<usize>, current: T) {
        if let Some(i) = n1 {
            self.add_source(i, -current);
        }
        if let Some(j) = n2 {
            self.add_source(j, current);
        }
    }

    /// Stamp the branch coupling of a voltage-defined element: +-1 KCL
    /// entries in the branch column and the matching +-1 voltage terms in
    /// the branch row. The caller fills the rest of the branch row.
    pub fn stamp_branch(&mut self, n1: Option<usize>, n2: Option<usize>, br: usize) {
        if let Some(i) = n1 {
            self.add(i, br, T::one());
            self.add(br, i, T::one());
        }
        if let Some(j) = n2 {
            self.add(j, br, -T::one());
            self.add(br, j, -T::one());
        }
    }

    /// Infinity norm of A (maximum absolute row sum).
    fn norm_inf(&self) -> f64 {
        let n = self.size;
        let mut norm = 0.0f64;
        for i in 0..n {
            let mut row = 0.0;
            for j in 0..n {
                row += self.a[i * n + j].magnitude();
            }
            norm = norm.max(row);
        }
        norm
    }

    /// Perform LU decomposition with partial pivoting. A pivot whose
    /// magnitude falls below `PIVOT_EPSILON * ||A||_inf` makes the matrix
    /// singular.
    pub fn factor(&mut self) -> Result<()> {
        let n = self.size;
        let threshold = PIVOT_EPSILON * self.norm_inf();
        self.lu.copy_from_slice(&self.a);

        for i in 0..n {
            self.pivots[i] = i;
        }

        for k in 0..n {
            // Find pivot
            let mut max_val = self.lu[k * n + k].magnitude();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = self.lu[i * n + k].magnitude();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val <= threshold {
                return Err(NodalError::SingularMatrix);
            }

            // Swap rows if needed
            if max_row != k {
                self.pivots.swap(k, max_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, max_row * n + j);
                }
            }

            // Eliminate
            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    let sub = factor * self.lu[k * n + j];
                    self.lu[i * n + j] -= sub;
                }
            }
        }

        Ok(())
    }

    /// Solve the system using the pre-computed LU decomposition.
    pub fn solve(&mut self) -> Result<()> {
        let n = self.size;

        // Apply pivot permutation to z
        for i in 0..n {
            self.x[i] = self.z[self.pivots[i]];
        }

        // Forward substitution (L * y = Pz)
        for i in 0..n {
            for j in 0..i {
                let sub = self.lu[i * n + j] * self.x[j];
                self.x[i] -= sub;
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                let sub = self.lu[i * n + j] * self.x[j];
                self.x[i] -= sub;
            }
            self.x[i] = self.x[i] / self.lu[i * n + i];
        }

        Ok(())
    }

    /// Get the voltage at a node index (ground reads zero).
    pub fn voltage(&self, node: Option<usize>) -> T {
        match node {
            Some(i) => self.x[i],
            None => T::zero(),
        }
    }
}
