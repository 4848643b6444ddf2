//! Common types and IPC protocol for netplan solver workers.
//!
//! This crate defines the solver-agnostic MIP representation shared between
//! the planner in `netplan-algo` and solver workers (e.g. `netplan-mip`),
//! plus the isolated execution supervisor that runs a worker under
//! wall-clock and memory ceilings.
//!
//! # Architecture
//!
//! The worker system uses a subprocess model with JSON over stdin/stdout.
//! This design isolates solver failures from the caller, keeps memory
//! reclamation deterministic (the child is killed, not asked to stop), and
//! keeps the solver library out of the caller's address space.
//!
//! ```text
//! netplan (caller) ──stdin──> netplan-mip (subprocess)
//!                  <─stdout──
//!                  <─stderr── (logs/errors)
//! ```
//!
//! An in-process backend ([`backend::ClarabelBackend`]) is also provided
//! for small models and tests; it implements the same [`backend::SolverBackend`]
//! contract as the worker side.
//!
//! # Protocol Version
//!
//! The IPC protocol is versioned to ensure compatibility between the caller
//! and worker binaries. Breaking changes increment [`PROTOCOL_VERSION`].

pub mod backend;
pub mod error;
pub mod limits;
pub mod plugin;
pub mod problem;
pub mod solution;
pub mod subprocess;

pub use backend::{ClarabelBackend, SolverBackend};
pub use error::{ExitCode, SolverError, SolverResult};
pub use limits::{LimitBreach, ModelLimits};
pub use plugin::{run_solver_plugin, SolverPlugin};
pub use problem::{Constraint, ConstraintSense, MipProblem, VarKind, VarSpec};
pub use solution::{MipSolution, SolutionStatus};
pub use subprocess::{is_worker_installed, SolverProcess, SupervisorConfig};

/// Protocol version for IPC compatibility checking.
/// Increment when making breaking changes to the schema.
pub const PROTOCOL_VERSION: i32 = 1;

/// Name of the worker binary implementing the solver protocol.
pub const WORKER_BINARY: &str = "netplan-mip";
