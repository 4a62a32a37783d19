//! Hard-priority hierarchical solver.
//!
//! Levels are solved strictly in rank order. Level 1 solves its own QP;
//! each later level inherits every earlier level's inequality and equality
//! systems plus one frozen block per solved level `j`:
//!
//! `A_j x = A_j x*_j`
//!
//! freezing the *value* `A_j x*_j`, not `x*_j` itself, so a rank-deficient
//! `A_j` does not over-constrain `x`. The frozen rows are exact equality
//! constraints handed to the backend; priority strictness comes from
//! equality satisfaction, never from weighting. On infeasibility the whole
//! hierarchy terminates: no later level is solved and no approximate
//! answer is fabricated.

use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use taskpri_core::cancel::CancelToken;
use taskpri_core::error::{DimensionMismatchError, FailureReport, SolveError};
use taskpri_core::level::PriorityLevel;
use taskpri_core::task::{Objective, Task};

use crate::aggregate::{stack_tasks, vcat, vstack};
use crate::backend::{ClarabelBackend, QpBackend};
use crate::standard_form::{assemble, equality_system, inequality_system};

/// Record of one solved level.
#[derive(Clone, Debug)]
pub struct LevelRecord {
    /// Priority rank (1 = highest).
    pub rank: usize,
    /// The aggregated task matrix `A_i` exactly as used at solve time.
    /// Cached so later levels freeze against it even if the model changes
    /// within the cycle.
    pub task_matrix: DMatrix<f64>,
    /// This level's optimal assignment.
    pub x_opt: DVector<f64>,
    /// Attained task value `A_i x*_i`, the quantity later levels preserve.
    pub attained: DVector<f64>,
}

/// Result of a successful hierarchy solve.
#[derive(Clone, Debug)]
pub struct HierarchySolution {
    /// The lowest-priority level's solution, consistent with every higher
    /// level by construction.
    pub x: DVector<f64>,
    /// Per-level records in rank order.
    pub levels: Vec<LevelRecord>,
    /// Total solve time in microseconds.
    pub solve_time_us: u64,
}

/// Sequential hard-priority solver over a stack of levels.
pub struct HierarchicalSolver<B: QpBackend = ClarabelBackend> {
    backend: B,
}

impl HierarchicalSolver<ClarabelBackend> {
    /// Solver backed by Clarabel with default settings.
    pub fn with_defaults() -> Self {
        Self::new(ClarabelBackend::with_defaults())
    }
}

impl<B: QpBackend> HierarchicalSolver<B> {
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Solve the full hierarchy.
    pub fn solve(&self, levels: &[PriorityLevel]) -> Result<HierarchySolution, SolveError> {
        self.solve_with_cancel(levels, &CancelToken::new())
    }

    /// Solve the full hierarchy with cooperative cancellation between
    /// levels. Mid-QP-call cancellation is not supported.
    pub fn solve_with_cancel(
        &self,
        levels: &[PriorityLevel],
        cancel: &CancelToken,
    ) -> Result<HierarchySolution, SolveError> {
        let start = Instant::now();

        let n = levels
            .iter()
            .find_map(PriorityLevel::n_vars)
            .ok_or(DimensionMismatchError::EmptyHierarchy)?;

        // Constraint systems accumulate down the hierarchy.
        let mut carried_g = DMatrix::zeros(0, n);
        let mut carried_h = DVector::zeros(0);
        let mut carried_f = DMatrix::zeros(0, n);
        let mut carried_c = DVector::zeros(0);
        // Frozen equality rows from solved levels.
        let mut frozen_f = DMatrix::zeros(0, n);
        let mut frozen_c = DVector::zeros(0);

        let mut records: Vec<LevelRecord> = Vec::with_capacity(levels.len());
        let mut x_current = DVector::zeros(n);

        for (index, level) in levels.iter().enumerate() {
            let rank = index + 1;
            if cancel.is_cancelled() {
                return Err(SolveError::Cancelled { level: rank });
            }

            let aggregated = stack_tasks(level.tasks()).map_err(SolveError::Dimension)?;
            if let Some(task) = aggregated.as_ref() {
                if task.cols() != n {
                    return Err(SolveError::Dimension(DimensionMismatchError::Columns {
                        expected: n,
                        got: task.cols(),
                    }));
                }
            }
            let objective = aggregated
                .as_ref()
                .map_or_else(|| Objective::zero(n), Task::objective);

            let (g_i, h_i) = inequality_system(level.constraints(), n)?;
            let (f_i, c_i) = equality_system(level.constraints(), n)?;
            carried_g = vstack(&carried_g, &g_i);
            carried_h = vcat(&carried_h, &h_i);
            carried_f = vstack(&carried_f, &f_i);
            carried_c = vcat(&carried_c, &c_i);

            let problem = assemble(
                objective,
                carried_g.clone(),
                carried_h.clone(),
                carried_f.clone(),
                carried_c.clone(),
                &frozen_f,
                &frozen_c,
            );

            // An empty-objective, unconstrained level is a pure pass-through:
            // any x is optimal, so the previous assignment stands and no
            // backend call is made.
            let x_opt = if problem.is_trivial() {
                x_current.clone()
            } else {
                match self.backend.solve(&problem) {
                    Ok(x) => x,
                    Err(failure) => {
                        let report = FailureReport {
                            n_vars: n,
                            n_ineq: problem.n_ineq(),
                            n_eq: carried_f.nrows(),
                            n_frozen: frozen_f.nrows(),
                        };
                        warn!("hierarchy failed at level {rank}: {failure} ({report})");
                        return Err(SolveError::Failed {
                            level: rank,
                            failure,
                            report,
                        });
                    }
                }
            };

            // Freeze this level's attained value. An empty objective
            // contributes a zero-row block.
            let task_matrix = aggregated
                .map_or_else(|| DMatrix::zeros(0, n), |task| task.matrix().clone());
            let attained = &task_matrix * &x_opt;
            frozen_f = vstack(&frozen_f, &task_matrix);
            frozen_c = vcat(&frozen_c, &attained);

            debug!(
                "level {rank} solved: {} task rows, {} ineq, {} eq, {} frozen",
                task_matrix.nrows(),
                problem.n_ineq(),
                carried_f.nrows(),
                frozen_f.nrows() - task_matrix.nrows()
            );

            x_current = x_opt.clone();
            records.push(LevelRecord {
                rank,
                task_matrix,
                x_opt,
                attained,
            });
        }

        let elapsed = start.elapsed();
        Ok(HierarchySolution {
            x: x_current,
            levels: records,
            solve_time_us: u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
        })
    }
}

/// Solve a hierarchy with the default Clarabel backend.
pub fn solve_hierarchy(levels: &[PriorityLevel]) -> Result<HierarchySolution, SolveError> {
    HierarchicalSolver::with_defaults().solve(levels)
}
