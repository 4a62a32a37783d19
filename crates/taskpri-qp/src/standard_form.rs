//! Standard-form QP assembly.
//!
//! A level's objective and constraints are assembled into the standard
//! form: minimize `x^T Q x + p^T x` subject to `G x <= h`, `F x = c`
//! (the `Q = A^T W A` convention; see [`Objective`]).
//! Bounds enter `G` as signed identity rows: `h_j` for each finite upper
//! bound, `-l_j` (with a `-1` row) for each finite lower bound; infinite
//! entries contribute no row.

use nalgebra::{DMatrix, DVector};
use taskpri_core::constraint::{BoundsProvider, EqualitySystemProvider};
use taskpri_core::error::DimensionMismatchError;
use taskpri_core::task::Objective;

use crate::aggregate::{vcat, vstack};

/// A fully assembled standard-form QP handed to a backend.
#[derive(Clone, Debug, PartialEq)]
pub struct QpProblem {
    /// Symmetric cost Hessian.
    pub q: DMatrix<f64>,
    /// Linear cost term.
    pub p: DVector<f64>,
    /// Inequality matrix (`G x <= h`). May be zero-row.
    pub g: DMatrix<f64>,
    /// Inequality bounds.
    pub h: DVector<f64>,
    /// Equality matrix (`F x = c`). May be zero-row.
    pub f: DMatrix<f64>,
    /// Equality targets.
    pub c: DVector<f64>,
}

impl QpProblem {
    pub fn n_vars(&self) -> usize {
        self.q.nrows()
    }

    pub fn n_ineq(&self) -> usize {
        self.g.nrows()
    }

    pub fn n_eq(&self) -> usize {
        self.f.nrows()
    }

    /// True when the problem has neither objective curvature nor any
    /// constraint row (nothing for a backend to do).
    pub fn is_trivial(&self) -> bool {
        self.n_ineq() == 0
            && self.n_eq() == 0
            && self.p.iter().all(|v| *v == 0.0)
            && self.q.iter().all(|v| *v == 0.0)
    }
}

/// Expand bound constraints into stacked `(G, h)` inequality rows.
///
/// Each provider spans all `n_vars` variables; finite upper bounds become
/// `+e_j^T x <= u_j` rows, finite lower bounds `-e_j^T x <= -l_j` rows.
pub fn inequality_system<B: BoundsProvider>(
    providers: &[B],
    n_vars: usize,
) -> Result<(DMatrix<f64>, DVector<f64>), DimensionMismatchError> {
    // Count rows first, then fill.
    let mut n_rows = 0;
    for provider in providers {
        let (lower, upper) = (provider.lower_bound(), provider.upper_bound());
        if lower.len() != n_vars {
            return Err(DimensionMismatchError::Columns {
                expected: n_vars,
                got: lower.len(),
            });
        }
        n_rows += upper.iter().filter(|v| v.is_finite()).count();
        n_rows += lower.iter().filter(|v| v.is_finite()).count();
    }

    let mut g = DMatrix::zeros(n_rows, n_vars);
    let mut h = DVector::zeros(n_rows);
    let mut row = 0;
    for provider in providers {
        for (j, hi) in provider.upper_bound().iter().enumerate() {
            if hi.is_finite() {
                g[(row, j)] = 1.0;
                h[row] = *hi;
                row += 1;
            }
        }
        for (j, lo) in provider.lower_bound().iter().enumerate() {
            if lo.is_finite() {
                g[(row, j)] = -1.0;
                h[row] = -lo;
                row += 1;
            }
        }
    }
    debug_assert_eq!(row, n_rows, "inequality row count mismatch");

    Ok((g, h))
}

/// Stack equality systems into `(F, c)`.
pub fn equality_system<E: EqualitySystemProvider>(
    providers: &[E],
    n_vars: usize,
) -> Result<(DMatrix<f64>, DVector<f64>), DimensionMismatchError> {
    let mut n_rows = 0;
    for provider in providers {
        let a = provider.a_eq();
        if a.nrows() > 0 && a.ncols() != n_vars {
            return Err(DimensionMismatchError::Columns {
                expected: n_vars,
                got: a.ncols(),
            });
        }
        n_rows += a.nrows();
    }

    let mut f = DMatrix::zeros(n_rows, n_vars);
    let mut c = DVector::zeros(n_rows);
    let mut row = 0;
    for provider in providers {
        let m = provider.a_eq().nrows();
        if m > 0 {
            f.rows_mut(row, m).copy_from(provider.a_eq());
            c.rows_mut(row, m).copy_from(provider.b_eq());
            row += m;
        }
    }

    Ok((f, c))
}

/// Assemble one level's standard-form problem from its objective, its
/// inequality/equality systems, and the frozen rows inherited from
/// higher-priority levels.
pub fn assemble(
    objective: Objective,
    g: DMatrix<f64>,
    h: DVector<f64>,
    f: DMatrix<f64>,
    c: DVector<f64>,
    frozen_f: &DMatrix<f64>,
    frozen_c: &DVector<f64>,
) -> QpProblem {
    let f_full = if frozen_f.nrows() == 0 {
        f
    } else {
        vstack(&f, frozen_f)
    };
    let c_full = if frozen_c.is_empty() {
        c
    } else {
        vcat(&c, frozen_c)
    };
    QpProblem {
        q: objective.q,
        p: objective.p,
        g,
        h,
        f: f_full,
        c: c_full,
    }
}
