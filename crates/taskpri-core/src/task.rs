//! Objective tasks and their QP standard-form expansion.
//!
//! A task is a weighted linear system minimized as `||A x - b||^2_W`.
//! Expanded:
//!
//! `||A x - b||^2_W = x^T A^T W A x - 2 b^T W A x + b^T W b`
//!
//! giving the standard-form pair `Q = A^T W A`, `p = -2 b^T W A`. The
//! constant term `b^T W b` does not depend on `x` and is dropped.

use nalgebra::{DMatrix, DVector};

use crate::error::DimensionMismatchError;
use crate::linear::{LinearSystem, Weight};

/// Standard-form quadratic objective `(Q, p)`.
///
/// With `Q = A^T W A` and `p = -2 b^T W A`, the minimized quantity is
/// `x^T Q x + p^T x` (the residual norm minus its constant term). Backends
/// using a `1/2 x^T P x` convention must scale `Q` by two.
#[derive(Clone, Debug, PartialEq)]
pub struct Objective {
    /// Symmetric cost Hessian.
    pub q: DMatrix<f64>,
    /// Linear cost term.
    pub p: DVector<f64>,
}

impl Objective {
    /// A no-op objective over `n` variables (zero `Q` and `p`).
    pub fn zero(n: usize) -> Self {
        Self {
            q: DMatrix::zeros(n, n),
            p: DVector::zeros(n),
        }
    }
}

/// An objective task wrapping a weighted linear system.
#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    system: LinearSystem,
}

impl Task {
    /// Build a task from `(A, b, W)`.
    pub fn new(
        matrix: DMatrix<f64>,
        vector: DVector<f64>,
        weight: Weight,
    ) -> Result<Self, DimensionMismatchError> {
        Ok(Self {
            system: LinearSystem::new(matrix, vector, weight)?,
        })
    }

    /// Build an unweighted task (`W = I`).
    pub fn unweighted(
        matrix: DMatrix<f64>,
        vector: DVector<f64>,
    ) -> Result<Self, DimensionMismatchError> {
        Self::new(matrix, vector, Weight::Identity)
    }

    /// Wrap an existing linear system.
    pub const fn from_system(system: LinearSystem) -> Self {
        Self { system }
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        self.system.matrix()
    }

    pub fn vector(&self) -> &DVector<f64> {
        self.system.vector()
    }

    pub fn weight(&self) -> &Weight {
        self.system.weight()
    }

    pub fn rows(&self) -> usize {
        self.system.rows()
    }

    pub fn cols(&self) -> usize {
        self.system.cols()
    }

    /// Expand to the QP standard-form pair `Q = A^T W A`, `p = -2 b^T W A`.
    ///
    /// `Q` is symmetrized by averaging with its transpose so downstream
    /// solvers can assume exact symmetry. A zero-row task yields the zero
    /// objective and never fails.
    pub fn objective(&self) -> Objective {
        let n = self.cols();
        if self.rows() == 0 {
            return Objective::zero(n);
        }
        let wa = self.weight().apply_left(self.matrix());
        let q_raw = self.matrix().transpose() * &wa;
        let q = (&q_raw + q_raw.transpose()) * 0.5;
        // p column form: -2 (W A)^T b = -2 A^T W b (W symmetric).
        let p = wa.transpose() * self.vector() * -2.0;
        Objective { q, p }
    }

    /// Residual `A x - b` at a candidate solution.
    pub fn residual(&self, x: &DVector<f64>) -> DVector<f64> {
        self.matrix() * x - self.vector()
    }

    /// Attained task value `A x` at a candidate solution.
    pub fn value(&self, x: &DVector<f64>) -> DVector<f64> {
        self.matrix() * x
    }
}
