//! Priority levels: the unit the hierarchical solver iterates over.

use crate::constraint::ConstraintSnapshot;
use crate::task::Task;

/// One level of the priority hierarchy.
///
/// Tasks within a level are soft-aggregated into a single objective;
/// constraints listed here are active at this level and every lower one.
/// Levels are totally ordered by their position in the hierarchy: index 0
/// is rank 1, the highest priority.
#[derive(Clone, Debug, Default)]
pub struct PriorityLevel {
    tasks: Vec<Task>,
    constraints: Vec<ConstraintSnapshot>,
}

impl PriorityLevel {
    /// Create an empty level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. Returns `self` for chaining.
    #[must_use]
    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Add a constraint snapshot. Returns `self` for chaining.
    #[must_use]
    pub fn with_constraint(mut self, constraint: ConstraintSnapshot) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn push_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn push_constraint(&mut self, constraint: ConstraintSnapshot) {
        self.constraints.push(constraint);
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn constraints(&self) -> &[ConstraintSnapshot] {
        &self.constraints
    }

    /// True when the level has neither tasks nor constraints.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.constraints.is_empty()
    }

    /// Decision dimension implied by this level's contents, if any.
    pub fn n_vars(&self) -> Option<usize> {
        self.tasks
            .first()
            .map(Task::cols)
            .or_else(|| self.constraints.first().map(ConstraintSnapshot::n_vars))
    }
}
