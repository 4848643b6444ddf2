//! Solver worker binary for the netplan isolated execution supervisor.
//!
//! This binary implements the netplan solver IPC protocol:
//! 1. Reads a JSON-encoded [`MipProblem`] from stdin
//! 2. Solves it with the Clarabel backend (LP relaxation of binaries)
//! 3. Writes a JSON-encoded [`MipSolution`] to stdout
//!
//! Running the solve here rather than in the caller's process is the point:
//! the supervisor can kill this process on a timeout or memory breach and
//! reclaim every byte it allocated, and a native crash inside the solver
//! surfaces as an exit code instead of taking the caller down.
//!
//! Exit codes are defined in `netplan_solver_common::ExitCode`.

use anyhow::Result;
use netplan_solver_common::plugin::{run_solver_plugin, SolverPlugin};
use netplan_solver_common::{ClarabelBackend, MipProblem, MipSolution, SolverBackend};

struct ClarabelWorker {
    backend: ClarabelBackend,
}

impl SolverPlugin for ClarabelWorker {
    fn name(&self) -> &'static str {
        "netplan-mip"
    }

    fn solve(&self, problem: &MipProblem) -> Result<MipSolution> {
        Ok(self.backend.solve(problem)?)
    }
}

fn main() {
    run_solver_plugin(ClarabelWorker {
        backend: ClarabelBackend,
    });
}
