//! Square matrices for Cannon multiplication
//!
//! Provides a row-major `f64` square matrix with a Cannon-backed
//! [`SquareMatrix::matmul`] and a naive reference product.
//!
//! # Example
//!
//! ```
//! use trueno_cannon::SquareMatrix;
//!
//! let a = SquareMatrix::from_vec(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
//! let i = SquareMatrix::identity(2);
//! assert_eq!(a.matmul(&i).unwrap(), a);
//! ```

use crate::config::CannonConfig;
use crate::engine::CannonEngine;
use crate::{CannonError, Result};

/// An `N x N` matrix of `f64` in row-major order
///
/// Element `(r, c)` lives at `data[r * N + c]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareMatrix {
    side: usize,
    data: Vec<f64>,
}

impl SquareMatrix {
    /// All-zero matrix
    pub fn zeros(side: usize) -> Self {
        Self::filled(side, 0.0)
    }

    /// Matrix with every element set to `value`
    pub fn filled(side: usize, value: f64) -> Self {
        Self {
            side,
            data: vec![value; side * side],
        }
    }

    /// Identity matrix
    ///
    /// # Example
    ///
    /// ```
    /// use trueno_cannon::SquareMatrix;
    ///
    /// let m = SquareMatrix::identity(3);
    /// assert_eq!(m.get(1, 1), Some(&1.0));
    /// assert_eq!(m.get(0, 1), Some(&0.0));
    /// ```
    pub fn identity(side: usize) -> Self {
        let mut m = Self::zeros(side);
        for i in 0..side {
            m.data[i * side + i] = 1.0;
        }
        m
    }

    /// Takes ownership of row-major data
    ///
    /// # Errors
    ///
    /// Returns `SizeMismatch` if `data.len() != side * side`.
    pub fn from_vec(side: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != side * side {
            return Err(CannonError::SizeMismatch {
                expected: side * side,
                actual: data.len(),
            });
        }
        Ok(Self { side, data })
    }

    /// Copies row-major data
    ///
    /// # Errors
    ///
    /// Returns `SizeMismatch` if `data.len() != side * side`.
    pub fn from_slice(side: usize, data: &[f64]) -> Result<Self> {
        Self::from_vec(side, data.to_vec())
    }

    /// Side length `N`
    pub fn side(&self) -> usize {
        self.side
    }

    /// Element at `(row, col)`, or `None` out of bounds
    pub fn get(&self, row: usize, col: usize) -> Option<&f64> {
        if row >= self.side || col >= self.side {
            return None;
        }
        self.data.get(row * self.side + col)
    }

    /// Row-major elements
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Consumes the matrix and returns its elements
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// `self x other` with Cannon's algorithm and the default configuration
    ///
    /// # Errors
    ///
    /// - `SizeMismatch` if the sides differ
    /// - `InexactGeometry` if the side does not tile into square blocks
    /// - `EmptyMatrix` for zero-sized matrices
    pub fn matmul(&self, other: &SquareMatrix) -> Result<SquareMatrix> {
        self.matmul_with(other, &CannonConfig::new())
    }

    /// `self x other` with Cannon's algorithm and an explicit configuration
    ///
    /// # Errors
    ///
    /// See [`SquareMatrix::matmul`]; `InvalidInput` for a zero worker cap.
    pub fn matmul_with(&self, other: &SquareMatrix, config: &CannonConfig) -> Result<SquareMatrix> {
        let mut engine = CannonEngine::new(&self.data, &other.data, config)?;
        engine.run()?;
        Ok(SquareMatrix {
            side: self.side,
            data: engine.into_output(),
        })
    }

    /// Reference triple-loop product (i-j-k order)
    ///
    /// # Errors
    ///
    /// Returns `SizeMismatch` if the sides differ.
    pub fn matmul_naive(&self, other: &SquareMatrix) -> Result<SquareMatrix> {
        if self.side != other.side {
            return Err(CannonError::SizeMismatch {
                expected: self.data.len(),
                actual: other.data.len(),
            });
        }
        let n = self.side;
        let mut result = SquareMatrix::zeros(n);
        for i in 0..n {
            let a_row = i * n;
            for j in 0..n {
                let mut sum = 0.0;
                for k in 0..n {
                    sum += self.data[a_row + k] * other.data[k * n + j];
                }
                result.data[a_row + j] = sum;
            }
        }
        Ok(result)
    }
}
