//! Weighted linear systems: the shared data structure behind tasks and
//! equality constraints.
//!
//! A `LinearSystem` holds a matrix/vector pair representing either an
//! equality relation `A x = b` or an inequality relation `G x <= h`,
//! together with a weight used when the system enters an objective as
//! `||A x - b||^2_W`.

use nalgebra::{DMatrix, DVector};

use crate::error::DimensionMismatchError;

/// Weight applied to a linear system's residual.
///
/// A scalar broadcasts to `w * I`; a full matrix is assumed symmetric
/// positive semi-definite.
#[derive(Clone, Debug, PartialEq)]
pub enum Weight {
    /// Unweighted least squares (`W = I`).
    Identity,
    /// Uniform scalar weight (`W = w * I`).
    Scalar(f64),
    /// Full weight matrix.
    Matrix(DMatrix<f64>),
}

impl Weight {
    /// Compute `W * A` without materializing identity or scalar weights.
    pub fn apply_left(&self, a: &DMatrix<f64>) -> DMatrix<f64> {
        match self {
            Self::Identity => a.clone(),
            Self::Scalar(w) => a * *w,
            Self::Matrix(m) => m * a,
        }
    }

    /// Compute `W * b`.
    pub fn apply_vec(&self, b: &DVector<f64>) -> DVector<f64> {
        match self {
            Self::Identity => b.clone(),
            Self::Scalar(w) => b * *w,
            Self::Matrix(m) => m * b,
        }
    }

    /// Materialize as a dense `m x m` block (used when stacking levels).
    pub fn to_block(&self, m: usize) -> DMatrix<f64> {
        match self {
            Self::Identity => DMatrix::identity(m, m),
            Self::Scalar(w) => DMatrix::identity(m, m) * *w,
            Self::Matrix(mat) => mat.clone(),
        }
    }

    /// Check compatibility with a system of `m` rows.
    fn validate(&self, m: usize) -> Result<(), DimensionMismatchError> {
        if let Self::Matrix(mat) = self {
            if mat.nrows() != m || mat.ncols() != m {
                return Err(DimensionMismatchError::Weight {
                    expected: m,
                    rows: mat.nrows(),
                    cols: mat.ncols(),
                });
            }
        }
        Ok(())
    }
}

impl Default for Weight {
    fn default() -> Self {
        Self::Identity
    }
}

/// A weighted linear system `(A, b, W)`.
///
/// Constructed fresh each control cycle from a live read of model state,
/// immutable once built, discarded after the cycle's solve completes.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearSystem {
    matrix: DMatrix<f64>,
    vector: DVector<f64>,
    weight: Weight,
}

impl LinearSystem {
    /// Build a system, validating that row counts agree and the weight
    /// (when a full matrix) is `m x m`.
    pub fn new(
        matrix: DMatrix<f64>,
        vector: DVector<f64>,
        weight: Weight,
    ) -> Result<Self, DimensionMismatchError> {
        if matrix.nrows() != vector.len() {
            return Err(DimensionMismatchError::RowVector {
                rows: matrix.nrows(),
                len: vector.len(),
            });
        }
        weight.validate(matrix.nrows())?;
        Ok(Self {
            matrix,
            vector,
            weight,
        })
    }

    /// Build an unweighted system (`W = I`).
    pub fn unweighted(
        matrix: DMatrix<f64>,
        vector: DVector<f64>,
    ) -> Result<Self, DimensionMismatchError> {
        Self::new(matrix, vector, Weight::Identity)
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn vector(&self) -> &DVector<f64> {
        &self.vector
    }

    pub fn weight(&self) -> &Weight {
        &self.weight
    }

    /// Number of rows (task/constraint dimensions).
    pub fn rows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of columns (decision variables).
    pub fn cols(&self) -> usize {
        self.matrix.ncols()
    }
}
