//! Decoded planning results and derived metrics.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One routed destination within a year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub facility: String,
    pub destination: String,
    /// Demand units routed along this lane in the year.
    pub demand: f64,
    pub unit_cost: f64,
    /// Miles, approximated from unit cost when not measured.
    pub distance: f64,
}

/// Per-facility figures for a single year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityMetrics {
    pub facility: String,
    pub destinations_served: usize,
    pub demand_served: f64,
    pub capacity: f64,
    /// `demand_served / capacity`, zero when capacity is zero.
    pub utilization: f64,
    /// Demand-weighted mean distance to served destinations.
    pub avg_distance: f64,
    /// Fixed lease for the year plus transport spend.
    pub total_cost: f64,
    pub cost_per_unit: f64,
}

/// Network-wide figures for a single year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkMetrics {
    /// Share of demand served within the distance threshold.
    pub service_level: f64,
    /// Demand-weighted mean distance across all assignments.
    pub avg_distance: f64,
    /// Mean utilization across open facilities.
    pub avg_utilization: f64,
    pub total_cost: f64,
    pub total_capacity: f64,
    pub total_demand: f64,
}

/// The plan for one forecast year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearPlan {
    pub year: i32,
    /// Facility ids open this year (identical across years by
    /// construction, repeated here so each year reads standalone).
    pub open_facilities: Vec<String>,
    pub assignments: Vec<Assignment>,
    pub facility_metrics: Vec<FacilityMetrics>,
    pub network: NetworkMetrics,
}

/// The full multi-year plan with horizon aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiYearPlan {
    pub years: Vec<YearPlan>,
    /// The horizon-wide facility set.
    pub open_facilities: Vec<String>,
    /// Total cost across all years (lease plus transport).
    pub total_cost: f64,
    /// Demand-weighted mean of the per-year service levels.
    pub service_level: f64,
    pub avg_cost_per_unit: f64,
    /// Raw objective value reported by the solver.
    pub objective: f64,
    pub solve_time: Duration,
    /// Peak worker RSS, reported only for isolated execution.
    pub peak_memory_mb: Option<u64>,
    pub status_message: String,
}

impl MultiYearPlan {
    /// Aggregate per-year plans into horizon totals.
    ///
    /// The service level is weighted by each year's total demand, so a
    /// heavy year moves the aggregate more than a light one.
    pub fn aggregate(
        years: Vec<YearPlan>,
        open_facilities: Vec<String>,
        objective: f64,
        solve_time: Duration,
        peak_memory_mb: Option<u64>,
        status_message: String,
    ) -> Self {
        let total_cost: f64 = years.iter().map(|y| y.network.total_cost).sum();
        let total_demand: f64 = years.iter().map(|y| y.network.total_demand).sum();
        let service_level = if total_demand > 0.0 {
            years
                .iter()
                .map(|y| y.network.service_level * y.network.total_demand)
                .sum::<f64>()
                / total_demand
        } else {
            0.0
        };
        // Cost per unit is over demand actually routed, not forecast
        // totals; the two agree only when every destination is assigned.
        let total_served: f64 = years
            .iter()
            .flat_map(|y| &y.assignments)
            .map(|a| a.demand)
            .sum();
        let avg_cost_per_unit = if total_served > 0.0 {
            total_cost / total_served
        } else {
            0.0
        };

        Self {
            years,
            open_facilities,
            total_cost,
            service_level,
            avg_cost_per_unit,
            objective,
            solve_time,
            peak_memory_mb,
            status_message,
        }
    }

    /// Render a human-readable summary of the plan.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Facility Network Plan ===\n");
        out.push_str(&format!("Status:          {}\n", self.status_message));
        out.push_str(&format!(
            "Open facilities: {} ({})\n",
            self.open_facilities.len(),
            self.open_facilities.join(", ")
        ));
        out.push_str(&format!("Total cost:      {:.2}\n", self.total_cost));
        out.push_str(&format!(
            "Service level:   {:.1}%\n",
            self.service_level * 100.0
        ));
        out.push_str(&format!("Cost per unit:   {:.4}\n", self.avg_cost_per_unit));
        out.push_str(&format!("Solve time:      {:.1?}\n", self.solve_time));
        if let Some(mb) = self.peak_memory_mb {
            out.push_str(&format!("Peak memory:     {} MB\n", mb));
        }
        for year in &self.years {
            out.push_str(&format!(
                "\n--- {} (demand {:.0}) ---\n",
                year.year, year.network.total_demand
            ));
            out.push_str(&format!(
                "  service level {:.1}%  avg distance {:.1} mi  cost {:.2}\n",
                year.network.service_level * 100.0,
                year.network.avg_distance,
                year.network.total_cost
            ));
            for fm in &year.facility_metrics {
                out.push_str(&format!(
                    "  {}: {} destinations, {:.0} units, {:.0}% utilized\n",
                    fm.facility,
                    fm.destinations_served,
                    fm.demand_served,
                    fm.utilization * 100.0
                ));
            }
        }
        out
    }
}
