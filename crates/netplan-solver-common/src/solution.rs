//! Solution representation returned by solver workers.

use serde::{Deserialize, Serialize};

/// Status of the solver solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionStatus {
    /// Optimal solution found.
    Optimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Solver timed out.
    Timeout,
    /// Generic error occurred.
    Error,
    /// Solution status unknown.
    Unknown,
}

impl SolutionStatus {
    /// Check if this status represents a successful solve.
    pub fn is_success(&self) -> bool {
        matches!(self, SolutionStatus::Optimal)
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "optimal"),
            SolutionStatus::Infeasible => write!(f, "infeasible"),
            SolutionStatus::Unbounded => write!(f, "unbounded"),
            SolutionStatus::Timeout => write!(f, "timeout"),
            SolutionStatus::Error => write!(f, "error"),
            SolutionStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Raw solver output: feasibility flag, objective, and one value per
/// variable in input order.
///
/// Infeasibility is a first-class status here, never an error: a worker
/// reporting [`SolutionStatus::Infeasible`] exits successfully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MipSolution {
    pub status: SolutionStatus,
    /// Objective value (NaN when no solution exists).
    pub objective: f64,
    /// Variable values in the input order of the problem.
    pub values: Vec<f64>,
    /// Solve time in milliseconds.
    pub solve_time_ms: i64,
    /// Peak resident memory observed by the supervisor, when available.
    #[serde(default)]
    pub peak_memory_mb: Option<u64>,
    /// Error message (if status is error/infeasible).
    pub error_message: Option<String>,
}

impl MipSolution {
    /// Create an empty solution with error status.
    pub fn error(message: &str) -> Self {
        Self {
            status: SolutionStatus::Error,
            objective: f64::NAN,
            values: Vec::new(),
            solve_time_ms: 0,
            peak_memory_mb: None,
            error_message: Some(message.to_string()),
        }
    }

    /// Create an infeasible solution.
    pub fn infeasible(message: &str) -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            ..Self::error(message)
        }
    }

    /// Create an optimal solution.
    pub fn optimal(objective: f64, values: Vec<f64>, solve_time_ms: i64) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            objective,
            values,
            solve_time_ms,
            peak_memory_mb: None,
            error_message: None,
        }
    }

    /// Check if the solution is optimal.
    pub fn is_optimal(&self) -> bool {
        self.status.is_success()
    }
}

impl Default for MipSolution {
    fn default() -> Self {
        Self::error("No solution")
    }
}
