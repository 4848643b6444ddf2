//! Plugin harness for solver worker binaries.
//!
//! Provides common infrastructure for worker binaries, eliminating
//! boilerplate for tracing setup, IPC handling, and error management.
//!
//! # Usage
//!
//! ```rust,ignore
//! use netplan_solver_common::plugin::{run_solver_plugin, SolverPlugin};
//! use netplan_solver_common::{MipProblem, MipSolution};
//! use anyhow::Result;
//!
//! struct MySolver;
//!
//! impl SolverPlugin for MySolver {
//!     fn name(&self) -> &'static str { "netplan-mysolver" }
//!     fn solve(&self, problem: &MipProblem) -> Result<MipSolution> {
//!         // Solver implementation
//!     }
//! }
//!
//! fn main() {
//!     run_solver_plugin(MySolver);
//! }
//! ```

use crate::error::ExitCode;
use crate::problem::MipProblem;
use crate::solution::MipSolution;
use crate::PROTOCOL_VERSION;
use anyhow::{Context, Result};
use std::io::{self, Read, Write};
use tracing::{debug, error, info, warn};

/// Trait for implementing a solver worker.
///
/// Implement this trait to create a worker binary. The harness handles
/// all IPC, logging, and error handling.
pub trait SolverPlugin {
    /// The worker name (e.g. "netplan-mip").
    fn name(&self) -> &'static str;

    /// Solve the given problem.
    ///
    /// Infeasibility must be reported through the solution status, not as
    /// an error; `Err` is reserved for faults (bad input, solver crash).
    fn solve(&self, problem: &MipProblem) -> Result<MipSolution>;

    /// Additional initialization before solving.
    ///
    /// Called after tracing is initialized but before reading the problem.
    fn init(&self) -> Result<()> {
        Ok(())
    }
}

/// Run a solver worker with the standard harness.
///
/// This function:
/// 1. Initializes tracing to stderr (respects `RUST_LOG`)
/// 2. Reads the problem from stdin (JSON)
/// 3. Calls `plugin.solve()` with the problem
/// 4. Writes the solution to stdout (JSON)
/// 5. Exits with the appropriate [`ExitCode`]
pub fn run_solver_plugin<P: SolverPlugin>(plugin: P) -> ! {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    info!(
        "{} v{} (protocol v{})",
        plugin.name(),
        env!("CARGO_PKG_VERSION"),
        PROTOCOL_VERSION
    );

    let exit_code = match run_plugin_inner(&plugin) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            error!("Solver error: {:?}", e);
            ExitCode::SolverError
        }
    };

    std::process::exit(exit_code as i32);
}

/// Inner implementation that can return errors.
fn run_plugin_inner<P: SolverPlugin>(plugin: &P) -> Result<()> {
    plugin.init().context("Solver initialization failed")?;

    debug!("Reading problem from stdin...");
    let mut input = Vec::new();
    io::stdin()
        .read_to_end(&mut input)
        .context("Failed to read problem from stdin")?;

    if input.is_empty() {
        anyhow::bail!("Empty input - no problem data received");
    }

    debug!("Received {} bytes of problem data", input.len());

    let problem: MipProblem =
        serde_json::from_slice(&input).context("Failed to parse JSON problem")?;

    if problem.protocol_version != PROTOCOL_VERSION {
        warn!(
            "Protocol version mismatch: problem v{}, worker v{}",
            problem.protocol_version, PROTOCOL_VERSION
        );
    }

    info!(
        "Problem: {} variables, {} constraints, {} coefficients",
        problem.num_variables(),
        problem.num_constraints(),
        problem.num_coefficients()
    );

    let solution = plugin.solve(&problem)?;

    debug!("Writing solution to stdout...");
    let output = serde_json::to_vec(&solution).context("Failed to serialize solution")?;
    io::stdout()
        .write_all(&output)
        .context("Failed to write solution to stdout")?;

    info!(
        "Solution written: status={:?}, objective={:.6}",
        solution.status, solution.objective
    );

    Ok(())
}
