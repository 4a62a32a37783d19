//! Concrete constraint sources and task builders over the model handle.
//!
//! These are the stock building blocks for a velocity-space whole-body QP:
//! joint limit boxes and posture/Cartesian tracking tasks with a PD
//! reference `v = v_d + k (p_d - p)`.

use nalgebra::{DMatrix, DVector};
use taskpri_core::constraint::{ConstraintSnapshot, ConstraintSource};
use taskpri_core::error::StaleReadError;
use taskpri_core::model::ModelHandle;
use taskpri_core::task::Task;

// ---------------------------------------------------------------------------
// JointVelocityLimits
// ---------------------------------------------------------------------------

/// Symmetric joint velocity box: `-v_max <= x <= v_max`.
#[derive(Debug, Default)]
pub struct JointVelocityLimits;

impl ConstraintSource for JointVelocityLimits {
    fn refresh(&self, model: &ModelHandle) -> Result<ConstraintSnapshot, StaleReadError> {
        let stale = StaleReadError {
            field: "velocity_limits",
        };
        let v_max = model.query().velocity_limits().ok_or(stale)?;
        if v_max.len() != model.dof() {
            return Err(stale);
        }
        ConstraintSnapshot::bounds_only(-&v_max, v_max).map_err(|_| stale)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "JointVelocityLimits"
    }
}

// ---------------------------------------------------------------------------
// JointPositionLimits
// ---------------------------------------------------------------------------

/// Position limits expressed in velocity space over one control step:
/// `(q_min - q) / dt <= x <= (q_max - q) / dt`.
#[derive(Debug)]
pub struct JointPositionLimits {
    /// Control timestep in seconds.
    pub dt: f64,
}

impl JointPositionLimits {
    pub const fn new(dt: f64) -> Self {
        Self { dt }
    }
}

impl ConstraintSource for JointPositionLimits {
    fn refresh(&self, model: &ModelHandle) -> Result<ConstraintSnapshot, StaleReadError> {
        let q = model.query().joint_positions().ok_or(StaleReadError {
            field: "joint_positions",
        })?;
        let limits_stale = StaleReadError {
            field: "position_limits",
        };
        let (q_min, q_max) = model.query().position_limits().ok_or(limits_stale)?;
        let n = model.dof();
        if q.len() != n || q_min.len() != n || q_max.len() != n {
            return Err(limits_stale);
        }
        let lower = (q_min - &q) / self.dt;
        let upper = (q_max - q) / self.dt;
        ConstraintSnapshot::bounds_only(lower, upper).map_err(|_| limits_stale)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "JointPositionLimits"
    }
}

// ---------------------------------------------------------------------------
// PostureTask
// ---------------------------------------------------------------------------

/// Joint-space task driving toward a desired posture: `I x = k (q_d - q)`.
#[derive(Clone, Debug)]
pub struct PostureTask {
    /// Desired joint positions.
    pub target: DVector<f64>,
    /// Proportional gain.
    pub gain: f64,
}

impl PostureTask {
    pub fn new(target: DVector<f64>, gain: f64) -> Self {
        Self { target, gain }
    }

    /// Build the task from current model state.
    pub fn build(&self, model: &ModelHandle) -> Result<Task, StaleReadError> {
        let stale = StaleReadError {
            field: "joint_positions",
        };
        let q = model.query().joint_positions().ok_or(stale)?;
        if q.len() != self.target.len() || q.len() != model.dof() {
            return Err(stale);
        }
        let n = q.len();
        let b = (&self.target - q) * self.gain;
        Task::unweighted(DMatrix::identity(n, n), b).map_err(|_| stale)
    }
}

// ---------------------------------------------------------------------------
// CartesianVelocityTask
// ---------------------------------------------------------------------------

/// Frame-space task `J(q) x = v_d + k (p_d - p)`.
///
/// The PD reference tracks a desired frame position `p_d` with velocity
/// feedforward `v_d`.
#[derive(Clone, Debug)]
pub struct CartesianVelocityTask {
    /// Name of the tracked frame.
    pub frame: String,
    /// Desired frame position.
    pub target_position: DVector<f64>,
    /// Desired frame velocity (feedforward).
    pub target_velocity: DVector<f64>,
    /// Proportional gain on the position error.
    pub gain: f64,
}

impl CartesianVelocityTask {
    pub fn new(
        frame: impl Into<String>,
        target_position: DVector<f64>,
        target_velocity: DVector<f64>,
        gain: f64,
    ) -> Self {
        Self {
            frame: frame.into(),
            target_position,
            target_velocity,
            gain,
        }
    }

    /// Build the task from current model state.
    pub fn build(&self, model: &ModelHandle) -> Result<Task, StaleReadError> {
        let jac_stale = StaleReadError {
            field: "frame_jacobian",
        };
        let jacobian = model.query().frame_jacobian(&self.frame).ok_or(jac_stale)?;
        let position = model
            .query()
            .frame_position(&self.frame)
            .ok_or(StaleReadError {
                field: "frame_position",
            })?;
        if jacobian.ncols() != model.dof()
            || jacobian.nrows() != position.len()
            || position.len() != self.target_position.len()
            || position.len() != self.target_velocity.len()
        {
            return Err(jac_stale);
        }
        let b = &self.target_velocity + (&self.target_position - position) * self.gain;
        Task::unweighted(jacobian, b).map_err(|_| jac_stale)
    }
}
