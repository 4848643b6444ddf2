//! Solver-agnostic MIP representation for worker IPC.
//!
//! Defines the data structures sent from the planner to solver workers.

use serde::{Deserialize, Serialize};

/// Kind of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    /// Binary decision in {0, 1}.
    Binary,
    /// Continuous value within the declared bounds.
    Continuous,
}

/// One decision variable of the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarSpec {
    /// Diagnostic name (e.g. `open[F1]`, `assign[F1,D3,2027]`).
    pub name: String,
    pub kind: VarKind,
    /// Lower bound (ignored for Binary, which is bounded to [0, 1]).
    pub lower: f64,
    /// Upper bound (ignored for Binary).
    pub upper: f64,
    /// Objective coefficient.
    pub objective: f64,
}

/// Sense of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintSense {
    /// `lhs <= rhs`
    Le,
    /// `lhs >= rhs`
    Ge,
    /// `lhs == rhs`
    Eq,
}

/// A linear constraint over variable indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    /// Diagnostic name (e.g. `capacity[F1,2027]`).
    pub name: String,
    /// Sparse terms: (variable index, coefficient).
    pub terms: Vec<(usize, f64)>,
    pub sense: ConstraintSense,
    pub rhs: f64,
}

/// A complete mixed-integer program in sparse form.
///
/// This is the wire format between the planner and solver workers: flat,
/// serde-serializable, and owned end-to-end by whichever side holds it.
/// Variable indices in [`Constraint::terms`] refer to positions in
/// [`MipProblem::variables`]; solution values come back in the same order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MipProblem {
    /// Protocol version for compatibility checking.
    pub protocol_version: i32,
    /// Minimize (true) or maximize (false) the objective.
    pub minimize: bool,
    pub variables: Vec<VarSpec>,
    pub constraints: Vec<Constraint>,
}

impl Default for MipProblem {
    fn default() -> Self {
        Self::new()
    }
}

impl MipProblem {
    /// Create an empty minimization problem.
    pub fn new() -> Self {
        Self {
            protocol_version: crate::PROTOCOL_VERSION,
            minimize: true,
            variables: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Add a binary variable, returning its index.
    pub fn add_binary(&mut self, name: impl Into<String>, objective: f64) -> usize {
        self.variables.push(VarSpec {
            name: name.into(),
            kind: VarKind::Binary,
            lower: 0.0,
            upper: 1.0,
            objective,
        });
        self.variables.len() - 1
    }

    /// Add a bounded continuous variable, returning its index.
    pub fn add_continuous(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        objective: f64,
    ) -> usize {
        self.variables.push(VarSpec {
            name: name.into(),
            kind: VarKind::Continuous,
            lower,
            upper,
            objective,
        });
        self.variables.len() - 1
    }

    /// Add a linear constraint.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(usize, f64)>,
        sense: ConstraintSense,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            sense,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Total non-zero constraint coefficients.
    pub fn num_coefficients(&self) -> usize {
        self.constraints.iter().map(|c| c.terms.len()).sum()
    }

    /// Objective value implied by a value vector (one entry per variable).
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.variables
            .iter()
            .zip(values)
            .map(|(v, x)| v.objective * x)
            .sum()
    }
}
