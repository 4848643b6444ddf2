//! Multi-year facility location and transportation assignment.
//!
//! This module implements a Mixed-Integer Linear Programming formulation
//! for deciding which facility sites to lease and how to route demand.
//!
//! ## Problem Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  MULTI-YEAR FACILITY NETWORK PLANNING                               │
//! │  ────────────────────────────────────                               │
//! │                                                                     │
//! │  Given:                                                             │
//! │    • Candidate facility sites with capacities and lease costs       │
//! │    • A unit-cost matrix between sites and destinations              │
//! │    • A demand forecast across the planning horizon                  │
//! │                                                                     │
//! │  Decide:                                                            │
//! │    • Which facilities to open for the whole horizon (binary,        │
//! │      fixed lease: decided once, charged every horizon-year)         │
//! │    • Which open facility serves each destination in each year       │
//! │                                                                     │
//! │  Minimize:                                                          │
//! │    Fixed lease cost + transport cost + service-distance penalty     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## MILP Formulation
//!
//! ```text
//! minimize    Σ_i  w_c·F·Y·open_i
//!           + Σ_ijt w_c·c_ij·d_jt·assign_ijt
//!           + Σ_ijt w_s·ρ·max(0, dist_ij − D)·d_jt·assign_ijt
//!
//! subject to:
//!   p_min ≤ Σ_i open_i ≤ p_max                 Facility count
//!   Σ_i assign_ijt = 1          ∀ j,t          Exactly-one assignment
//!   assign_ijt ≤ open_i         ∀ i,j,t        Open-linking
//!   Σ_j d_jt·assign_ijt ≤ K_i·open_i  ∀ i,t    Capacity
//!   Σ_ijt d_jt·assign_ijt·[dist_ij ≤ D]
//!       ≥ s · Σ_jt d_jt                        Service level (horizon-wide)
//!   open_i = 1                  ∀ i mandatory  Mandatory facilities
//!   open_i, assign_ijt ∈ {0,1}
//! ```
//!
//! The open decision is one shared binary per facility referenced by every
//! year's constraints; years are never solved independently and reconciled
//! afterwards.
//!
//! Distance is approximated as `unit_cost / cost_per_mile` when no direct
//! distance is supplied. The approximation is only as good as
//! `cost_per_mile` being representative; it is documented behavior, not a
//! measurement.
//!
//! Note that the service-level constraint aggregates over the entire
//! horizon rather than per year, so an individual year may fall below
//! target as long as the multi-year average clears it.

mod demand;
mod model;
mod problem;
mod solution;
mod solver;

pub use demand::scale_demand;
pub use model::{build_model, AssignVar, PlanModel};
pub use problem::{PlanProblem, PlanProblemBuilder};
pub use solution::{
    Assignment, FacilityMetrics, MultiYearPlan, NetworkMetrics, YearPlan,
};
pub use solver::{
    solve_plan, solve_plan_with_backend, ExecutionMode, PlanError, PlanSolverConfig,
};
