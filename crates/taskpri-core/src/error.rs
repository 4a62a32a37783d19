use std::fmt;

use thiserror::Error;

/// Top-level error type for the taskpri workspace.
#[derive(Debug, Error)]
pub enum TaskPriError {
    #[error("Constraint not initialized: {0}")]
    NotInitialized(#[from] NotInitializedError),

    #[error("Stale read: {0}")]
    StaleRead(#[from] StaleReadError),

    #[error("Dimension mismatch: {0}")]
    Dimension(#[from] DimensionMismatchError),

    #[error("Solve error: {0}")]
    Solve(#[from] SolveError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A constraint accessor was read before the first successful update.
///
/// Recoverable: call `update()` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("constraint accessed before first update")]
pub struct NotInitializedError;

/// A model query failed or returned a malformed shape during an update.
///
/// The constraint retains its previous valid snapshot; whether staleness
/// aborts the control cycle is the caller's decision.
///
/// Copy + static field names for cheap propagation in hot paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("model read failed or malformed for `{field}`")]
pub struct StaleReadError {
    /// The model quantity whose read failed.
    pub field: &'static str,
}

/// Mismatched shapes during construction, stacking, or aggregation.
///
/// Always a configuration bug, never transient: fatal to the current
/// cycle's solve.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DimensionMismatchError {
    #[error("Column count mismatch: expected {expected}, got {got}")]
    Columns { expected: usize, got: usize },

    #[error("Row/vector mismatch: matrix has {rows} rows, vector has {len}")]
    RowVector { rows: usize, len: usize },

    #[error("Weight dimension mismatch: expected {expected}x{expected}, got {rows}x{cols}")]
    Weight {
        expected: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Bound length mismatch: lower {lower}, upper {upper}")]
    Bounds { lower: usize, upper: usize },

    #[error("Inverted bounds at dimension {dim}: lower {lower} > upper {upper}")]
    InvertedBounds { dim: usize, lower: f64, upper: f64 },

    #[error("NaN bound at dimension {dim}")]
    NanBound { dim: usize },

    #[error("Cannot infer decision dimension: hierarchy has no tasks or constraints")]
    EmptyHierarchy,
}

/// Outcome of a single QP backend call that produced no solution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QpFailure {
    #[error("infeasible")]
    Infeasible,

    #[error("unbounded")]
    Unbounded,

    #[error("backend error: {0}")]
    Backend(String),
}

/// Accumulated problem sizes at a failing priority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureReport {
    /// Decision variable count.
    pub n_vars: usize,
    /// Inequality rows (bounds expanded, all levels up to the failure).
    pub n_ineq: usize,
    /// Plain equality rows (all levels up to the failure).
    pub n_eq: usize,
    /// Frozen equality rows inherited from solved levels.
    pub n_frozen: usize,
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vars={}, ineq rows={}, eq rows={}, frozen rows={}",
            self.n_vars, self.n_ineq, self.n_eq, self.n_frozen
        )
    }
}

/// Terminal failure of a hierarchy solve.
///
/// No automatic relaxation or retry: a failed hierarchy yields no control
/// output for the cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("Hierarchy failed at level {level}: {failure} ({report})")]
    Failed {
        /// Priority rank of the level whose QP failed (1 = highest).
        level: usize,
        failure: QpFailure,
        report: FailureReport,
    },

    #[error("Hierarchy cancelled before level {level}")]
    Cancelled { level: usize },

    #[error("Dimension mismatch: {0}")]
    Dimension(#[from] DimensionMismatchError),
}

/// Solver configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid max_iterations: 0 (must be > 0)")]
    ZeroMaxIterations,

    #[error("Invalid tolerance for {field}: {value} (must be > 0)")]
    InvalidTolerance { field: &'static str, value: f64 },
}
