//! Soft-priority aggregation: stacking a level's tasks into one augmented
//! task.
//!
//! The `A_i` are stacked vertically, the `b_i` likewise, and the weights
//! block-diagonally with zero cross terms (tasks within a level do not
//! interact through off-diagonal weight entries). When every `A_i` is a
//! Jacobian this is the augmented Jacobian.

use nalgebra::{DMatrix, DVector};
use taskpri_core::error::DimensionMismatchError;
use taskpri_core::linear::Weight;
use taskpri_core::task::Task;

/// Vertically stack two matrices with matching column counts.
pub(crate) fn vstack(top: &DMatrix<f64>, bottom: &DMatrix<f64>) -> DMatrix<f64> {
    debug_assert_eq!(top.ncols(), bottom.ncols());
    let mut out = DMatrix::zeros(top.nrows() + bottom.nrows(), top.ncols());
    out.rows_mut(0, top.nrows()).copy_from(top);
    out.rows_mut(top.nrows(), bottom.nrows()).copy_from(bottom);
    out
}

/// Vertically stack two vectors.
pub(crate) fn vcat(top: &DVector<f64>, bottom: &DVector<f64>) -> DVector<f64> {
    let mut out = DVector::zeros(top.len() + bottom.len());
    out.rows_mut(0, top.len()).copy_from(top);
    out.rows_mut(top.len(), bottom.len()).copy_from(bottom);
    out
}

/// Stack a level's tasks into one augmented task.
///
/// Returns `None` for an empty level. A single-task level degenerates to
/// that task with no stacking overhead. Tasks with mismatched column
/// counts are a configuration error.
pub fn stack_tasks(tasks: &[Task]) -> Result<Option<Task>, DimensionMismatchError> {
    let Some(first) = tasks.first() else {
        return Ok(None);
    };
    if tasks.len() == 1 {
        return Ok(Some(first.clone()));
    }

    let n = first.cols();
    for task in &tasks[1..] {
        if task.cols() != n {
            return Err(DimensionMismatchError::Columns {
                expected: n,
                got: task.cols(),
            });
        }
    }

    let total_rows: usize = tasks.iter().map(Task::rows).sum();
    let mut a = DMatrix::zeros(total_rows, n);
    let mut b = DVector::zeros(total_rows);
    let all_identity = tasks
        .iter()
        .all(|t| matches!(t.weight(), Weight::Identity));
    let mut w = if all_identity {
        None
    } else {
        Some(DMatrix::zeros(total_rows, total_rows))
    };

    let mut row = 0;
    for task in tasks {
        let m = task.rows();
        a.rows_mut(row, m).copy_from(task.matrix());
        b.rows_mut(row, m).copy_from(task.vector());
        if let Some(w) = w.as_mut() {
            w.view_mut((row, row), (m, m))
                .copy_from(&task.weight().to_block(m));
        }
        row += m;
    }

    let weight = match w {
        None => Weight::Identity,
        Some(w) => Weight::Matrix(w),
    };
    Task::new(a, b, weight).map(Some)
}
