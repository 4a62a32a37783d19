//! Constraints: immutable per-cycle snapshots plus the caching state that
//! implements the update/accessor contract.
//!
//! A constraint contributes bound rows (`lower <= x <= upper`), an equality
//! system (`A_eq x = b_eq`), or both. Snapshots are immutable values
//! produced fresh each control cycle; [`ConstraintState`] caches the last
//! good snapshot so a failed model read degrades to stale data instead of
//! propagating garbage.

use nalgebra::{DMatrix, DVector};
use tracing::warn;

use crate::error::{DimensionMismatchError, NotInitializedError, StaleReadError};
use crate::model::ModelHandle;

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Provides per-component bounds on the decision vector.
///
/// Entries may be `-inf`/`+inf`; such components contribute no inequality
/// row. Assembly code depends only on this interface, never on concrete
/// constraint types.
pub trait BoundsProvider {
    fn lower_bound(&self) -> &DVector<f64>;
    fn upper_bound(&self) -> &DVector<f64>;
}

/// Provides an equality system `A_eq x = b_eq` (possibly zero-row).
pub trait EqualitySystemProvider {
    fn a_eq(&self) -> &DMatrix<f64>;
    fn b_eq(&self) -> &DVector<f64>;
}

// ---------------------------------------------------------------------------
// ConstraintSnapshot
// ---------------------------------------------------------------------------

/// The values a constraint produced for one control cycle.
///
/// Bounds-only, equality-only, and mixed variants share this single shape;
/// callers must not assume either half is non-empty.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintSnapshot {
    lower: DVector<f64>,
    upper: DVector<f64>,
    a_eq: DMatrix<f64>,
    b_eq: DVector<f64>,
}

impl ConstraintSnapshot {
    /// A pure bound constraint: the equality system is empty.
    pub fn bounds_only(
        lower: DVector<f64>,
        upper: DVector<f64>,
    ) -> Result<Self, DimensionMismatchError> {
        let n = lower.len();
        Self::mixed(lower, upper, DMatrix::zeros(0, n), DVector::zeros(0))
    }

    /// A pure equality constraint over `n_vars` variables: bounds at
    /// plus/minus infinity.
    pub fn equality_only(
        a_eq: DMatrix<f64>,
        b_eq: DVector<f64>,
        n_vars: usize,
    ) -> Result<Self, DimensionMismatchError> {
        Self::mixed(
            DVector::from_element(n_vars, f64::NEG_INFINITY),
            DVector::from_element(n_vars, f64::INFINITY),
            a_eq,
            b_eq,
        )
    }

    /// A constraint with both halves populated.
    pub fn mixed(
        lower: DVector<f64>,
        upper: DVector<f64>,
        a_eq: DMatrix<f64>,
        b_eq: DVector<f64>,
    ) -> Result<Self, DimensionMismatchError> {
        if lower.len() != upper.len() {
            return Err(DimensionMismatchError::Bounds {
                lower: lower.len(),
                upper: upper.len(),
            });
        }
        for (dim, (lo, hi)) in lower.iter().zip(upper.iter()).enumerate() {
            if lo.is_nan() || hi.is_nan() {
                return Err(DimensionMismatchError::NanBound { dim });
            }
            if lo.is_finite() && hi.is_finite() && lo > hi {
                return Err(DimensionMismatchError::InvertedBounds {
                    dim,
                    lower: *lo,
                    upper: *hi,
                });
            }
        }
        if a_eq.nrows() != b_eq.len() {
            return Err(DimensionMismatchError::RowVector {
                rows: a_eq.nrows(),
                len: b_eq.len(),
            });
        }
        if a_eq.nrows() > 0 && a_eq.ncols() != lower.len() {
            return Err(DimensionMismatchError::Columns {
                expected: lower.len(),
                got: a_eq.ncols(),
            });
        }
        Ok(Self {
            lower,
            upper,
            a_eq,
            b_eq,
        })
    }

    /// A snapshot that constrains nothing over `n` variables.
    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: DVector::from_element(n, f64::NEG_INFINITY),
            upper: DVector::from_element(n, f64::INFINITY),
            a_eq: DMatrix::zeros(0, n),
            b_eq: DVector::zeros(0),
        }
    }

    /// Number of decision variables this snapshot spans.
    pub fn n_vars(&self) -> usize {
        self.lower.len()
    }

    /// Number of finite bound entries (each becomes one inequality row per
    /// side it bounds).
    pub fn finite_bound_rows(&self) -> usize {
        let lowers = self.lower.iter().filter(|v| v.is_finite()).count();
        let uppers = self.upper.iter().filter(|v| v.is_finite()).count();
        lowers + uppers
    }

    /// Number of equality rows.
    pub fn equality_rows(&self) -> usize {
        self.a_eq.nrows()
    }
}

impl BoundsProvider for ConstraintSnapshot {
    fn lower_bound(&self) -> &DVector<f64> {
        &self.lower
    }

    fn upper_bound(&self) -> &DVector<f64> {
        &self.upper
    }
}

impl EqualitySystemProvider for ConstraintSnapshot {
    fn a_eq(&self) -> &DMatrix<f64> {
        &self.a_eq
    }

    fn b_eq(&self) -> &DVector<f64> {
        &self.b_eq
    }
}

// ---------------------------------------------------------------------------
// ConstraintSource / ConstraintState
// ---------------------------------------------------------------------------

/// Produces a fresh constraint snapshot from live model state.
///
/// Sources only read the model; they never mutate it or each other, so
/// refreshing multiple sources against one handle is safe in any order.
pub trait ConstraintSource: Send + Sync {
    /// Read the model and build this cycle's snapshot.
    fn refresh(&self, model: &ModelHandle) -> Result<ConstraintSnapshot, StaleReadError>;

    /// Human-readable name for this constraint.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A constraint source paired with its model handle and last good snapshot.
///
/// Implements the per-cycle contract: [`update`](Self::update) re-reads the
/// model; on a stale read the previous snapshot is retained and the error
/// surfaced to the caller. Accessors fail with
/// [`NotInitializedError`] before the first successful update.
pub struct ConstraintState {
    source: Box<dyn ConstraintSource>,
    model: ModelHandle,
    last: Option<ConstraintSnapshot>,
}

impl ConstraintState {
    pub fn new(source: Box<dyn ConstraintSource>, model: ModelHandle) -> Self {
        Self {
            source,
            model,
            last: None,
        }
    }

    /// The model handle this constraint reads from.
    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Name of the wrapped source.
    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Re-read the model and refresh the cached snapshot.
    ///
    /// Safe to call every control cycle. On a stale read the cached
    /// snapshot is left untouched and the error returned.
    pub fn update(&mut self) -> Result<&ConstraintSnapshot, StaleReadError> {
        match self.source.refresh(&self.model) {
            Ok(snapshot) => Ok(&*self.last.insert(snapshot)),
            Err(err) => {
                warn!(
                    "constraint {}: stale read of `{}`, keeping previous snapshot",
                    self.source.name(),
                    err.field
                );
                Err(err)
            }
        }
    }

    /// The most recently computed snapshot.
    pub fn snapshot(&self) -> Result<&ConstraintSnapshot, NotInitializedError> {
        self.last.as_ref().ok_or(NotInitializedError)
    }

    pub fn lower_bound(&self) -> Result<&DVector<f64>, NotInitializedError> {
        self.snapshot().map(BoundsProvider::lower_bound)
    }

    pub fn upper_bound(&self) -> Result<&DVector<f64>, NotInitializedError> {
        self.snapshot().map(BoundsProvider::upper_bound)
    }

    pub fn a_eq(&self) -> Result<&DMatrix<f64>, NotInitializedError> {
        self.snapshot().map(EqualitySystemProvider::a_eq)
    }

    pub fn b_eq(&self) -> Result<&DVector<f64>, NotInitializedError> {
        self.snapshot().map(EqualitySystemProvider::b_eq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::model::StateQuery;

    struct TwoDof;

    impl StateQuery for TwoDof {
        fn dof(&self) -> usize {
            2
        }

        fn velocity_limits(&self) -> Option<DVector<f64>> {
            Some(DVector::from_column_slice(&[1.0, 2.0]))
        }
    }

    /// Source that reads velocity limits, with a switchable failure mode.
    struct VelocityBox {
        fail: AtomicBool,
    }

    impl ConstraintSource for VelocityBox {
        fn refresh(&self, model: &ModelHandle) -> Result<ConstraintSnapshot, StaleReadError> {
            if self.fail.load(Ordering::Relaxed) {
                return Err(StaleReadError {
                    field: "velocity_limits",
                });
            }
            let limits = model.query().velocity_limits().ok_or(StaleReadError {
                field: "velocity_limits",
            })?;
            ConstraintSnapshot::bounds_only(-&limits, limits).map_err(|_| StaleReadError {
                field: "velocity_limits",
            })
        }

        #[allow(clippy::unnecessary_literal_bound)]
        fn name(&self) -> &str {
            "VelocityBox"
        }
    }

    fn velocity_state(fail: bool) -> ConstraintState {
        ConstraintState::new(
            Box::new(VelocityBox {
                fail: AtomicBool::new(fail),
            }),
            ModelHandle::resolve(TwoDof),
        )
    }

    // ---- ConstraintSnapshot ----

    #[test]
    fn bounds_only_has_empty_equality() {
        let snap = ConstraintSnapshot::bounds_only(
            DVector::from_column_slice(&[-1.0, -2.0]),
            DVector::from_column_slice(&[1.0, 2.0]),
        )
        .unwrap();
        assert_eq!(snap.equality_rows(), 0);
        assert_eq!(snap.n_vars(), 2);
        assert_eq!(snap.finite_bound_rows(), 4);
    }

    #[test]
    fn equality_only_has_infinite_bounds() {
        let snap = ConstraintSnapshot::equality_only(
            DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
            DVector::from_column_slice(&[2.0]),
            2,
        )
        .unwrap();
        assert_eq!(snap.equality_rows(), 1);
        assert_eq!(snap.finite_bound_rows(), 0);
        assert!(snap.lower_bound().iter().all(|v| *v == f64::NEG_INFINITY));
        assert!(snap.upper_bound().iter().all(|v| *v == f64::INFINITY));
    }

    #[test]
    fn mixed_populates_both_halves() {
        let snap = ConstraintSnapshot::mixed(
            DVector::from_column_slice(&[-1.0, f64::NEG_INFINITY]),
            DVector::from_column_slice(&[1.0, f64::INFINITY]),
            DMatrix::from_row_slice(1, 2, &[0.0, 1.0]),
            DVector::from_column_slice(&[0.5]),
        )
        .unwrap();
        assert_eq!(snap.finite_bound_rows(), 2);
        assert_eq!(snap.equality_rows(), 1);
    }

    #[test]
    fn inverted_bounds_rejected() {
        let err = ConstraintSnapshot::bounds_only(
            DVector::from_column_slice(&[2.0]),
            DVector::from_column_slice(&[1.0]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DimensionMismatchError::InvertedBounds { dim: 0, .. }
        ));
    }

    #[test]
    fn nan_bounds_rejected() {
        // NaN fails every comparison, so without an explicit check it would
        // slip through as "unbounded". It must be a construction error.
        let err = ConstraintSnapshot::bounds_only(
            DVector::from_column_slice(&[0.0, f64::NAN]),
            DVector::from_column_slice(&[1.0, 1.0]),
        )
        .unwrap_err();
        assert!(matches!(err, DimensionMismatchError::NanBound { dim: 1 }));

        let err = ConstraintSnapshot::bounds_only(
            DVector::from_column_slice(&[0.0]),
            DVector::from_column_slice(&[f64::NAN]),
        )
        .unwrap_err();
        assert!(matches!(err, DimensionMismatchError::NanBound { dim: 0 }));
    }

    #[test]
    fn infinite_bounds_never_inverted() {
        // -inf > +inf comparisons must not trigger on infinite entries.
        let snap = ConstraintSnapshot::bounds_only(
            DVector::from_column_slice(&[f64::NEG_INFINITY]),
            DVector::from_column_slice(&[f64::INFINITY]),
        );
        assert!(snap.is_ok());
    }

    #[test]
    fn mismatched_bound_lengths_rejected() {
        let err = ConstraintSnapshot::bounds_only(DVector::zeros(2), DVector::zeros(3)).unwrap_err();
        assert!(matches!(
            err,
            DimensionMismatchError::Bounds { lower: 2, upper: 3 }
        ));
    }

    #[test]
    fn equality_column_mismatch_rejected() {
        let err = ConstraintSnapshot::equality_only(
            DMatrix::from_row_slice(1, 3, &[1.0, 0.0, 0.0]),
            DVector::from_column_slice(&[1.0]),
            2,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DimensionMismatchError::Columns {
                expected: 2,
                got: 3
            }
        ));
    }

    #[test]
    fn unbounded_constrains_nothing() {
        let snap = ConstraintSnapshot::unbounded(3);
        assert_eq!(snap.finite_bound_rows(), 0);
        assert_eq!(snap.equality_rows(), 0);
        assert_eq!(snap.n_vars(), 3);
    }

    // ---- ConstraintState ----

    #[test]
    fn accessors_fail_before_first_update() {
        let state = velocity_state(false);
        assert_eq!(state.snapshot().unwrap_err(), NotInitializedError);
        assert!(state.lower_bound().is_err());
        assert!(state.upper_bound().is_err());
        assert!(state.a_eq().is_err());
        assert!(state.b_eq().is_err());
    }

    #[test]
    fn update_caches_snapshot() {
        let mut state = velocity_state(false);
        state.update().unwrap();
        let lower = state.lower_bound().unwrap();
        assert_eq!(lower.len(), 2);
        assert!((lower[1] - (-2.0)).abs() < 1e-12);
        assert_eq!(state.a_eq().unwrap().nrows(), 0);
    }

    #[test]
    fn failed_first_update_leaves_state_uninitialized() {
        let mut state = velocity_state(true);
        assert!(state.update().is_err());
        assert!(state.snapshot().is_err());
    }

    #[test]
    fn stale_read_retains_previous_snapshot() {
        // Shared flag so the failure mode can be flipped after the first
        // successful update.
        use std::sync::Arc;

        struct FlaggedBox {
            fail: Arc<AtomicBool>,
        }

        impl ConstraintSource for FlaggedBox {
            fn refresh(&self, model: &ModelHandle) -> Result<ConstraintSnapshot, StaleReadError> {
                if self.fail.load(Ordering::Relaxed) {
                    return Err(StaleReadError {
                        field: "velocity_limits",
                    });
                }
                let limits = model.query().velocity_limits().ok_or(StaleReadError {
                    field: "velocity_limits",
                })?;
                ConstraintSnapshot::bounds_only(-&limits, limits).map_err(|_| StaleReadError {
                    field: "velocity_limits",
                })
            }
        }

        let flag = Arc::new(AtomicBool::new(false));
        let mut state = ConstraintState::new(
            Box::new(FlaggedBox { fail: flag.clone() }),
            ModelHandle::resolve(TwoDof),
        );
        state.update().unwrap();
        let before = state.snapshot().unwrap().clone();

        flag.store(true, Ordering::Relaxed);
        let err = state.update().unwrap_err();
        assert_eq!(err.field, "velocity_limits");
        assert_eq!(state.snapshot().unwrap(), &before);
    }

    #[test]
    fn state_reports_source_name() {
        let state = velocity_state(false);
        assert_eq!(state.name(), "VelocityBox");
    }
}
