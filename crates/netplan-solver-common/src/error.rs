//! Error types and exit codes for solver communication.

use std::time::Duration;
use thiserror::Error;

/// Exit codes for solver subprocess communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success (check status in solution for optimality)
    Success = 0,
    /// Invalid input (malformed JSON, missing fields)
    InvalidInput = 1,
    /// Solver error (numerical issues, backend failure)
    SolverError = 2,
    /// Timeout
    Timeout = 3,
    /// Segfault (SIGSEGV) - native crash
    Segfault = 139,
}

impl ExitCode {
    /// Convert from raw exit code to ExitCode enum.
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => ExitCode::Success,
            1 => ExitCode::InvalidInput,
            3 => ExitCode::Timeout,
            139 => ExitCode::Segfault,
            _ => ExitCode::SolverError, // Unknown codes treated as solver error
        }
    }

    /// Check if this exit code indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

/// Errors that can occur during solver operations.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The worker binary could not be located.
    #[error("Solver worker '{hint}' is not installed (searched ~/.netplan/solvers and PATH)")]
    WorkerNotInstalled { hint: String },

    /// Solver process failed to start.
    #[error("Failed to start solver process: {0}")]
    ProcessStart(#[source] std::io::Error),

    /// Solver process crashed or returned an error.
    #[error("Solver process failed with exit code {exit_code:?}: {message}")]
    ProcessFailed { exit_code: ExitCode, message: String },

    /// Wall-clock ceiling breached; the worker was killed.
    #[error("Solver timed out after {elapsed:.1?} (limit {limit:.1?})")]
    Timeout { limit: Duration, elapsed: Duration },

    /// Memory ceiling breached; the worker was killed.
    #[error(
        "Solver exceeded memory ceiling: {observed_mb} MB resident against a {limit_mb} MB limit after {elapsed:.1?}"
    )]
    MemoryLimit {
        limit_mb: u64,
        observed_mb: u64,
        elapsed: Duration,
    },

    /// IPC communication error.
    #[error("IPC error: {0}")]
    Ipc(String),

    /// In-process backend failure (numerical trouble, bad model).
    #[error("Solver backend error: {0}")]
    Backend(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for solver operations.
pub type SolverResult<T> = Result<T, SolverError>;
