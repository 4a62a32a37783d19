//! The resolved model handle: the read-only query surface constraints and
//! tasks read robot state through.
//!
//! The core never inspects the concrete model: resolution (robot lookup,
//! URDF loading, simulator binding) happens elsewhere and produces a single
//! [`ModelHandle`]. Queries return `Option`; `None` signals a stale or
//! unsupported read and is surfaced by callers as a
//! [`StaleReadError`](crate::error::StaleReadError).

use std::fmt;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

/// Read-only query surface over live robot state.
///
/// Implementations must be synchronous and side-effect free; every vector
/// is sized by [`dof`](Self::dof) unless noted.
pub trait StateQuery: Send + Sync {
    /// Number of decision variables (degrees of freedom).
    fn dof(&self) -> usize;

    /// Current joint position vector.
    fn joint_positions(&self) -> Option<DVector<f64>> {
        None
    }

    /// Current joint velocity vector.
    fn joint_velocities(&self) -> Option<DVector<f64>> {
        None
    }

    /// Joint position limits as `(lower, upper)`.
    fn position_limits(&self) -> Option<(DVector<f64>, DVector<f64>)> {
        None
    }

    /// Symmetric joint velocity limit magnitudes.
    fn velocity_limits(&self) -> Option<DVector<f64>> {
        None
    }

    /// World position of a named frame.
    fn frame_position(&self, _frame: &str) -> Option<DVector<f64>> {
        None
    }

    /// Jacobian of a named frame (rows x dof).
    fn frame_jacobian(&self, _frame: &str) -> Option<DMatrix<f64>> {
        None
    }

    /// Human-readable name for this model.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A resolved, shareable model handle.
///
/// Constraints query the model through this handle but never own or
/// mutate it.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<dyn StateQuery>,
}

impl ModelHandle {
    /// Wrap a resolved state query as a handle.
    pub fn resolve(query: impl StateQuery + 'static) -> Self {
        Self {
            inner: Arc::new(query),
        }
    }

    /// Number of decision variables.
    pub fn dof(&self) -> usize {
        self.inner.dof()
    }

    /// Access the underlying query surface.
    pub fn query(&self) -> &dyn StateQuery {
        self.inner.as_ref()
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("name", &self.inner.name())
            .field("dof", &self.inner.dof())
            .finish()
    }
}
