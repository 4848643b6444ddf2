//! Model complexity guard.
//!
//! Stateless pre-solve check on model size. Oversized models are rejected
//! with the breached ceiling and the amount of the excess before any solver
//! process is spawned or any backend is invoked.

use crate::problem::MipProblem;
use thiserror::Error;

/// A complexity ceiling breached by a model.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LimitBreach {
    #[error("model has {count} variables, exceeding the ceiling of {limit} by {}", .count - .limit)]
    Variables { count: usize, limit: usize },

    #[error("model has {count} constraints, exceeding the ceiling of {limit} by {}", .count - .limit)]
    Constraints { count: usize, limit: usize },

    #[error("model has {count} non-zero coefficients, exceeding the ceiling of {limit} by {}", .count - .limit)]
    Coefficients { count: usize, limit: usize },

    #[error("model serializes to {bytes} bytes, exceeding the ceiling of {limit} by {}", .bytes - .limit)]
    SerializedSize { bytes: usize, limit: usize },
}

/// Ceilings applied by [`ModelLimits::check`].
#[derive(Debug, Clone)]
pub struct ModelLimits {
    pub max_variables: usize,
    pub max_constraints: usize,
    pub max_coefficients: usize,
    pub max_serialized_bytes: usize,
}

impl Default for ModelLimits {
    fn default() -> Self {
        Self {
            max_variables: 1000,
            max_constraints: 500,
            max_coefficients: 100_000,
            max_serialized_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ModelLimits {
    /// Reject a model exceeding any configured ceiling.
    ///
    /// Count ceilings are checked first; the serialized-size check only
    /// runs for models that already passed them.
    pub fn check(&self, problem: &MipProblem) -> Result<(), LimitBreach> {
        let vars = problem.num_variables();
        if vars > self.max_variables {
            return Err(LimitBreach::Variables {
                count: vars,
                limit: self.max_variables,
            });
        }
        let cons = problem.num_constraints();
        if cons > self.max_constraints {
            return Err(LimitBreach::Constraints {
                count: cons,
                limit: self.max_constraints,
            });
        }
        let coefs = problem.num_coefficients();
        if coefs > self.max_coefficients {
            return Err(LimitBreach::Coefficients {
                count: coefs,
                limit: self.max_coefficients,
            });
        }
        // Serialization of the plain wire structs cannot fail in practice.
        let bytes = serde_json::to_vec(problem).map(|v| v.len()).unwrap_or(0);
        if bytes > self.max_serialized_bytes {
            return Err(LimitBreach::SerializedSize {
                bytes,
                limit: self.max_serialized_bytes,
            });
        }
        Ok(())
    }
}
