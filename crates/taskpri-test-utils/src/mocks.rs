//! A scriptable in-memory model for tests.
//!
//! Every query answers from data scripted at construction time; anything
//! left unscripted answers `None`, which exercises the stale-read paths.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};
use taskpri_core::model::{ModelHandle, StateQuery};

/// In-memory [`StateQuery`] with builder-style scripting.
#[derive(Debug, Default)]
pub struct MockModel {
    dof: usize,
    positions: Option<DVector<f64>>,
    velocities: Option<DVector<f64>>,
    position_limits: Option<(DVector<f64>, DVector<f64>)>,
    velocity_limits: Option<DVector<f64>>,
    frames: HashMap<String, (DVector<f64>, DMatrix<f64>)>,
}

impl MockModel {
    /// A model with `dof` joints and no scripted data.
    pub fn new(dof: usize) -> Self {
        Self {
            dof,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_positions(mut self, q: &[f64]) -> Self {
        self.positions = Some(DVector::from_column_slice(q));
        self
    }

    #[must_use]
    pub fn with_velocities(mut self, v: &[f64]) -> Self {
        self.velocities = Some(DVector::from_column_slice(v));
        self
    }

    #[must_use]
    pub fn with_position_limits(mut self, lower: &[f64], upper: &[f64]) -> Self {
        self.position_limits = Some((
            DVector::from_column_slice(lower),
            DVector::from_column_slice(upper),
        ));
        self
    }

    #[must_use]
    pub fn with_velocity_limits(mut self, v_max: &[f64]) -> Self {
        self.velocity_limits = Some(DVector::from_column_slice(v_max));
        self
    }

    /// Script a named frame's world position and Jacobian.
    #[must_use]
    pub fn with_frame(mut self, name: &str, position: &[f64], jacobian: DMatrix<f64>) -> Self {
        self.frames.insert(
            name.to_owned(),
            (DVector::from_column_slice(position), jacobian),
        );
        self
    }

    /// Wrap this model as a resolved handle.
    pub fn into_handle(self) -> ModelHandle {
        ModelHandle::resolve(self)
    }
}

impl StateQuery for MockModel {
    fn dof(&self) -> usize {
        self.dof
    }

    fn joint_positions(&self) -> Option<DVector<f64>> {
        self.positions.clone()
    }

    fn joint_velocities(&self) -> Option<DVector<f64>> {
        self.velocities.clone()
    }

    fn position_limits(&self) -> Option<(DVector<f64>, DVector<f64>)> {
        self.position_limits.clone()
    }

    fn velocity_limits(&self) -> Option<DVector<f64>> {
        self.velocity_limits.clone()
    }

    fn frame_position(&self, frame: &str) -> Option<DVector<f64>> {
        self.frames.get(frame).map(|(p, _)| p.clone())
    }

    fn frame_jacobian(&self, frame: &str) -> Option<DMatrix<f64>> {
        self.frames.get(frame).map(|(_, j)| j.clone())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "MockModel"
    }
}
