//! QP backend abstraction and the Clarabel adapter.
//!
//! The core never implements a QP solver; it assembles standard-form
//! inputs and interprets three outcomes: a solution, infeasible, or
//! unbounded. The shipped adapter uses Clarabel (pure Rust interior-point
//! solver) with a `ZeroCone` for equalities and a `NonnegativeCone` for
//! inequalities.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus,
    SupportedConeT::{self, NonnegativeConeT, ZeroConeT},
};
use nalgebra::{DMatrix, DVector};
use taskpri_core::config::SolverConfig;
use taskpri_core::error::QpFailure;

use crate::aggregate::{vcat, vstack};
use crate::standard_form::QpProblem;

/// A generic QP backend solving one standard-form problem.
pub trait QpBackend: Send + Sync {
    /// Solve for `x*`, or report why none exists.
    fn solve(&self, problem: &QpProblem) -> Result<DVector<f64>, QpFailure>;

    /// Human-readable name for this backend.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Clarabel interior-point backend.
pub struct ClarabelBackend {
    config: SolverConfig,
}

impl ClarabelBackend {
    pub const fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(SolverConfig::default())
    }

    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }
}

impl QpBackend for ClarabelBackend {
    fn solve(&self, problem: &QpProblem) -> Result<DVector<f64>, QpFailure> {
        let n = problem.n_vars();
        let n_eq = problem.n_eq();
        let n_ineq = problem.n_ineq();

        // Clarabel constraint block: equalities (ZeroCone) stacked on top
        // of inequalities (NonnegativeCone), A x + s = b.
        let a_all = vstack(&problem.f, &problem.g);
        let b_all = vcat(&problem.c, &problem.h);

        // Clarabel minimizes 1/2 x^T P x + q^T x; our objective pair is the
        // x^T Q x + p^T x convention, so P = 2Q.
        let q_scaled = &problem.q * 2.0;
        let p_csc = dmatrix_to_csc_upper_tri(&q_scaled);
        let a_csc = dmatrix_to_csc(&a_all);

        let mut cones: Vec<SupportedConeT<f64>> = Vec::with_capacity(2);
        if n_eq > 0 {
            cones.push(ZeroConeT(n_eq));
        }
        if n_ineq > 0 {
            cones.push(NonnegativeConeT(n_ineq));
        }

        let settings = DefaultSettingsBuilder::default()
            .max_iter(self.config.max_iterations)
            .verbose(self.config.verbose)
            .tol_gap_abs(self.config.tol_gap_abs)
            .tol_gap_rel(self.config.tol_gap_rel)
            .tol_feas(self.config.tol_feas)
            .build()
            .map_err(|e| QpFailure::Backend(format!("invalid settings: {e:?}")))?;

        let q_slice: Vec<f64> = problem.p.iter().copied().collect();
        let b_slice: Vec<f64> = b_all.iter().copied().collect();

        let mut solver = DefaultSolver::new(&p_csc, &q_slice, &a_csc, &b_slice, &cones, settings)
            .map_err(|e| QpFailure::Backend(format!("{e:?}")))?;
        solver.solve();

        let solution = &solver.solution;
        match solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {
                Ok(DVector::from_column_slice(&solution.x[..n]))
            }
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                Err(QpFailure::Infeasible)
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                Err(QpFailure::Unbounded)
            }
            status => Err(QpFailure::Backend(format!("{status:?}"))),
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ClarabelBackend"
    }
}

/// Convert a nalgebra `DMatrix<f64>` to a Clarabel `CscMatrix<f64>` (full matrix).
fn dmatrix_to_csc(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..nrows {
            let v = m[(i, j)];
            if v.abs() > 1e-15 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

/// Convert a symmetric nalgebra `DMatrix<f64>` to upper-triangular `CscMatrix<f64>`.
fn dmatrix_to_csc_upper_tri(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..=j.min(nrows.saturating_sub(1)) {
            let v = m[(i, j)];
            if v.abs() > 1e-15 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use taskpri_core::task::Task;

    fn unconstrained(problem_q: DMatrix<f64>, problem_p: DVector<f64>) -> QpProblem {
        let n = problem_q.nrows();
        QpProblem {
            q: problem_q,
            p: problem_p,
            g: DMatrix::zeros(0, n),
            h: DVector::zeros(0),
            f: DMatrix::zeros(0, n),
            c: DVector::zeros(0),
        }
    }

    #[test]
    fn solves_direct_least_squares() {
        // min ||x - [1, 2]||^2: x* = [1, 2].
        let obj = Task::unweighted(
            DMatrix::identity(2, 2),
            DVector::from_column_slice(&[1.0, 2.0]),
        )
        .unwrap()
        .objective();
        let backend = ClarabelBackend::with_defaults();
        let x = backend.solve(&unconstrained(obj.q, obj.p)).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-5);
    }

    #[test]
    fn respects_equality_constraints() {
        // min ||x||^2 s.t. x_0 + x_1 = 2: x* = [1, 1].
        let mut problem = unconstrained(DMatrix::identity(2, 2) * 2.0, DVector::zeros(2));
        problem.f = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        problem.c = DVector::from_column_slice(&[2.0]);
        let x = ClarabelBackend::with_defaults().solve(&problem).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn respects_inequality_constraints() {
        // min ||x - 10||^2 s.t. x <= 1: boundary-active x* = 1.
        let obj = Task::unweighted(
            DMatrix::identity(1, 1),
            DVector::from_column_slice(&[10.0]),
        )
        .unwrap()
        .objective();
        let mut problem = unconstrained(obj.q, obj.p);
        problem.g = DMatrix::from_row_slice(1, 1, &[1.0]);
        problem.h = DVector::from_column_slice(&[1.0]);
        let x = ClarabelBackend::with_defaults().solve(&problem).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn reports_infeasible() {
        // x = 2 (equality) and x <= 1 (inequality) cannot both hold.
        let mut problem = unconstrained(DMatrix::identity(1, 1), DVector::zeros(1));
        problem.f = DMatrix::from_row_slice(1, 1, &[1.0]);
        problem.c = DVector::from_column_slice(&[2.0]);
        problem.g = DMatrix::from_row_slice(1, 1, &[1.0]);
        problem.h = DVector::from_column_slice(&[1.0]);
        let err = ClarabelBackend::with_defaults().solve(&problem).unwrap_err();
        assert_eq!(err, QpFailure::Infeasible);
    }

    #[test]
    fn csc_conversion_full() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 2.0, 3.0]);
        let csc = dmatrix_to_csc(&m);
        assert_eq!(csc.m, 2);
        assert_eq!(csc.n, 2);
        // Column 0 holds entries 1.0 (row 0) and 2.0 (row 1); column 1 only 3.0.
        assert_eq!(csc.colptr, vec![0, 2, 3]);
        assert_eq!(csc.rowval, vec![0, 1, 1]);
    }

    #[test]
    fn csc_conversion_upper_tri_drops_lower() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 4.0, 4.0, 2.0]);
        let csc = dmatrix_to_csc_upper_tri(&m);
        // Entries: (0,0)=1, (0,1)=4, (1,1)=2; the (1,0) mirror is dropped.
        assert_eq!(csc.colptr, vec![0, 1, 3]);
        assert_eq!(csc.nzval, vec![1.0, 4.0, 2.0]);
    }

    #[test]
    fn backend_name() {
        assert_eq!(ClarabelBackend::with_defaults().name(), "ClarabelBackend");
    }
}
