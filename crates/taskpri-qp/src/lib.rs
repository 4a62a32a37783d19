//! Task-priority QP assembly and solving.
//!
//! Soft priorities stack a level's tasks into one augmented objective;
//! hard priorities solve levels sequentially, each constrained to preserve
//! every higher level's attained task value. See [`hierarchy`] for the
//! central algorithm.

pub mod aggregate;
pub mod backend;
pub mod hierarchy;
pub mod providers;
pub mod standard_form;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use aggregate::stack_tasks;
pub use backend::{ClarabelBackend, QpBackend};
pub use hierarchy::{solve_hierarchy, HierarchicalSolver, HierarchySolution, LevelRecord};
pub use standard_form::QpProblem;
