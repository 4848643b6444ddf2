//! Planning problem data structures.

use netplan_core::{CapacityMap, CostMatrix, DemandMap, FacilityParams, ForecastYear};
use std::collections::HashMap;

/// A complete planning problem: candidate sites, costs, capacities,
/// demand trajectory, and parameters.
///
/// All entities are created fresh per invocation and discarded once the
/// caller consumes the result; nothing here persists between solves.
#[derive(Debug, Clone)]
pub struct PlanProblem {
    /// Unit costs: ordered facility rows by ordered destination columns.
    pub cost_matrix: CostMatrix,
    /// Explicit per-site capacities; sites without an entry use
    /// [`FacilityParams::max_capacity_per_facility`].
    pub capacities: CapacityMap,
    /// Model parameters (all defaulted, partial configuration is valid).
    pub params: FacilityParams,
    /// Ordered demand forecast, strictly increasing years.
    pub forecast: Vec<ForecastYear>,
    /// Baseline demand distribution whose destination shares are rescaled
    /// to each year's forecast total. Absent or zero-total baselines split
    /// demand evenly.
    pub baseline_demand: Option<DemandMap>,
    /// Explicit per-year demand maps that bypass scaling entirely.
    pub demand_overrides: HashMap<i32, DemandMap>,
}

impl PlanProblem {
    /// Create a problem with default parameters and no forecast.
    pub fn new(cost_matrix: CostMatrix) -> Self {
        Self {
            cost_matrix,
            capacities: CapacityMap::new(),
            params: FacilityParams::default(),
            forecast: Vec::new(),
            baseline_demand: None,
            demand_overrides: HashMap::new(),
        }
    }

    /// Number of candidate facility sites.
    pub fn num_candidates(&self) -> usize {
        self.cost_matrix.num_facilities()
    }

    /// Number of destinations.
    pub fn num_destinations(&self) -> usize {
        self.cost_matrix.num_destinations()
    }

    /// Number of planning years.
    pub fn num_years(&self) -> usize {
        self.forecast.len()
    }

    /// Effective capacity for a facility row, applying the default.
    pub fn capacity_of(&self, facility_row: usize) -> f64 {
        let id = &self.cost_matrix.facility_ids()[facility_row];
        self.capacities
            .capacity_or(id, self.params.max_capacity_per_facility)
    }

    /// Distance from facility row to destination column, approximated from
    /// unit cost when no direct distance is available.
    pub fn distance(&self, facility_row: usize, destination_col: usize) -> f64 {
        self.cost_matrix.cost(facility_row, destination_col) / self.params.cost_per_mile
    }

    /// Total demand across the whole horizon.
    pub fn total_horizon_demand(&self) -> f64 {
        self.forecast.iter().map(|fy| fy.demand_units).sum()
    }
}

/// Builder for constructing planning problems.
pub struct PlanProblemBuilder {
    problem: PlanProblem,
}

impl PlanProblemBuilder {
    /// Start building from a cost matrix.
    pub fn new(cost_matrix: CostMatrix) -> Self {
        Self {
            problem: PlanProblem::new(cost_matrix),
        }
    }

    /// Set the model parameters.
    pub fn params(mut self, params: FacilityParams) -> Self {
        self.problem.params = params;
        self
    }

    /// Set explicit site capacities.
    pub fn capacities(mut self, capacities: CapacityMap) -> Self {
        self.problem.capacities = capacities;
        self
    }

    /// Append one forecast year.
    pub fn forecast_year(mut self, year: i32, demand_units: f64) -> Self {
        self.problem
            .forecast
            .push(ForecastYear::new(year, demand_units));
        self
    }

    /// Set the baseline demand distribution.
    pub fn baseline_demand(mut self, baseline: DemandMap) -> Self {
        self.problem.baseline_demand = Some(baseline);
        self
    }

    /// Provide an explicit demand map for one year, bypassing scaling.
    pub fn demand_override(mut self, year: i32, demand: DemandMap) -> Self {
        self.problem.demand_overrides.insert(year, demand);
        self
    }

    /// Build the planning problem.
    pub fn build(self) -> PlanProblem {
        self.problem
    }
}
