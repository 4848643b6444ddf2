//! In-process solver backend.
//!
//! Maps the wire-format [`MipProblem`] onto `good_lp` and solves with the
//! pure-Rust Clarabel interior-point solver.
//!
//! This is a **simplified LP relaxation**: binary variables are treated as
//! continuous [0, 1] and read back with a 0.5 threshold. Facility-location
//! instances with dominant cost structure solve integrally under the
//! relaxation; an exact MILP worker can be substituted behind the same
//! [`SolverBackend`] contract.

use crate::error::{SolverError, SolverResult};
use crate::problem::{ConstraintSense, MipProblem, VarKind};
use crate::solution::{MipSolution, SolutionStatus};
use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel, Variable};
use std::time::Instant;
use tracing::debug;

/// Contract between the planner and any conforming MIP/LP solver.
///
/// Implementations must be re-entrant: each call builds its own solver
/// state, and nothing is shared between concurrent invocations.
pub trait SolverBackend {
    /// The backend name (e.g. "clarabel").
    fn name(&self) -> &'static str;

    /// Solve the problem. Infeasibility is reported through
    /// [`SolutionStatus::Infeasible`], never as an `Err`.
    fn solve(&self, problem: &MipProblem) -> SolverResult<MipSolution>;
}

/// Clarabel-backed LP relaxation (always available, no native code).
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelBackend;

impl SolverBackend for ClarabelBackend {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn solve(&self, problem: &MipProblem) -> SolverResult<MipSolution> {
        let start = Instant::now();

        let mut vars = variables!();
        let handles: Vec<Variable> = problem
            .variables
            .iter()
            .map(|spec| {
                let (lower, upper) = match spec.kind {
                    // Binary relaxed to the unit interval; declared bounds
                    // inside it (e.g. a forced-open facility) are honored.
                    VarKind::Binary => (spec.lower.max(0.0), spec.upper.min(1.0)),
                    VarKind::Continuous => (spec.lower, spec.upper),
                };
                vars.add(variable().min(lower).max(upper))
            })
            .collect();

        let mut objective = Expression::from(0.0);
        for (spec, handle) in problem.variables.iter().zip(&handles) {
            if spec.objective != 0.0 {
                objective += spec.objective * *handle;
            }
        }

        let unsolved = if problem.minimize {
            vars.minimise(objective)
        } else {
            vars.maximise(objective)
        };
        let mut model = unsolved.using(clarabel);

        for cons in &problem.constraints {
            let mut lhs = Expression::from(0.0);
            for &(idx, coef) in &cons.terms {
                let handle = handles.get(idx).ok_or_else(|| {
                    SolverError::Backend(format!(
                        "constraint '{}' references unknown variable index {}",
                        cons.name, idx
                    ))
                })?;
                lhs += coef * *handle;
            }
            model = match cons.sense {
                ConstraintSense::Le => model.with(constraint!(lhs <= cons.rhs)),
                ConstraintSense::Ge => model.with(constraint!(lhs >= cons.rhs)),
                ConstraintSense::Eq => model.with(constraint!(lhs == cons.rhs)),
            };
        }

        debug!(
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            "solving with clarabel"
        );

        match model.solve() {
            Ok(solution) => {
                let values: Vec<f64> = handles.iter().map(|h| solution.value(*h)).collect();
                let objective = problem.objective_value(&values);
                Ok(MipSolution::optimal(
                    objective,
                    values,
                    start.elapsed().as_millis() as i64,
                ))
            }
            Err(ResolutionError::Infeasible) => {
                Ok(MipSolution::infeasible("solver reported infeasible"))
            }
            Err(ResolutionError::Unbounded) => Ok(MipSolution {
                status: SolutionStatus::Unbounded,
                ..MipSolution::error("solver reported unbounded")
            }),
            Err(e) => Err(SolverError::Backend(format!("{:?}", e))),
        }
    }
}
