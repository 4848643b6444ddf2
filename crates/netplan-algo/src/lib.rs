//! # netplan-algo: Multi-year facility network optimization
//!
//! This crate decides which candidate facility sites to open for an entire
//! planning horizon and how to route every destination's demand to an open
//! facility in every planning year.
//!
//! The formulation, builder, and result types live in the [`plan`] module:
//!
//! - **[`plan::PlanProblem`]**: typed inputs (cost matrix, capacities,
//!   forecast, parameters) with a fluent builder
//! - **[`plan::build_model`]**: MIP construction with one shared open
//!   decision per facility across all years
//! - **[`plan::solve_plan`]**: orchestration — validation, demand scaling,
//!   complexity guard, solve (in-process or isolated worker), decoding
//! - **[`plan::MultiYearPlan`]**: per-year assignments and metrics plus
//!   horizon totals
//!
//! ## Example
//!
//! ```ignore
//! use netplan_algo::plan::{solve_plan, PlanProblemBuilder, PlanSolverConfig};
//! use netplan_core::{CostMatrix, FacilityParams};
//!
//! let matrix = CostMatrix::new(facilities, destinations, costs)?;
//! let problem = PlanProblemBuilder::new(matrix)
//!     .forecast_year(2027, 48_000.0)
//!     .forecast_year(2028, 55_000.0)
//!     .params(FacilityParams::default().with_facility_count(1, 3))
//!     .build();
//!
//! let plan = solve_plan(&problem, &PlanSolverConfig::default())?;
//! println!("{}", plan.summary());
//! ```

pub mod plan;

pub use plan::{
    solve_plan, MultiYearPlan, PlanError, PlanProblem, PlanProblemBuilder, PlanSolverConfig,
    YearPlan,
};
