//! MIP model construction for the facility network plan.
//!
//! Builds the solver-agnostic [`MipProblem`] from a validated
//! [`PlanProblem`] and the per-year demand maps, keeping enough bookkeeping
//! to decode the raw value vector afterwards.

use super::problem::PlanProblem;
use netplan_core::DemandMap;
use netplan_solver_common::{ConstraintSense, MipProblem};
use tracing::debug;

/// Bookkeeping for one `assign` variable.
#[derive(Debug, Clone)]
pub struct AssignVar {
    /// Index into the MIP value vector.
    pub var: usize,
    /// Facility row in the cost matrix.
    pub facility: usize,
    /// Destination column in the cost matrix.
    pub destination: usize,
    /// Index into the forecast (not the calendar year).
    pub year_idx: usize,
    /// Demand routed if this assignment activates.
    pub demand: f64,
    pub unit_cost: f64,
    pub distance: f64,
}

/// A built model plus the index maps needed to decode its solution.
#[derive(Debug, Clone)]
pub struct PlanModel {
    pub mip: MipProblem,
    /// One shared `open` variable per facility row, horizon-wide
    /// (the fixed-lease decision).
    pub open_vars: Vec<usize>,
    /// One `assign` variable per reachable (facility, destination, year).
    pub assign_vars: Vec<AssignVar>,
    /// Calendar years, in forecast order.
    pub years: Vec<i32>,
    /// Demand maps aligned with `years`.
    pub demand_by_year: Vec<DemandMap>,
}

/// Construct the multi-year MIP.
///
/// Unreachable (facility, destination) pairs get no `assign` variable at
/// all; they are fixed at zero by omission. All years share the same
/// `open` variables, so the facility set is decided once for the horizon.
pub fn build_model(problem: &PlanProblem, demand_by_year: &[(i32, DemandMap)]) -> PlanModel {
    let params = &problem.params;
    let matrix = &problem.cost_matrix;
    let facilities = matrix.facility_ids();
    let destinations = matrix.destination_ids();
    let num_years = demand_by_year.len();

    let mut mip = MipProblem::new();

    // Fixed lease: charged once per horizon-year once opened.
    let open_vars: Vec<usize> = facilities
        .iter()
        .map(|f| {
            let coef = params.weight_cost * params.fixed_cost_per_facility * num_years as f64;
            mip.add_binary(format!("open[{}]", f), coef)
        })
        .collect();

    let mut assign_vars: Vec<AssignVar> = Vec::new();
    for (t, (year, demand)) in demand_by_year.iter().enumerate() {
        for (j, dest) in destinations.iter().enumerate() {
            let d_jt = demand.get(dest).copied().unwrap_or(0.0);
            for (i, fac) in facilities.iter().enumerate() {
                if !matrix.is_reachable(i, j) {
                    continue;
                }
                let unit_cost = matrix.cost(i, j);
                let distance = problem.distance(i, j);
                let excess = (distance - params.max_distance_miles).max(0.0);
                let coef = d_jt
                    * (params.weight_cost * unit_cost
                        + params.weight_service_level
                            * params.service_penalty_per_unit_mile
                            * excess);
                let var = mip.add_binary(format!("assign[{},{},{}]", fac, dest, year), coef);
                assign_vars.push(AssignVar {
                    var,
                    facility: i,
                    destination: j,
                    year_idx: t,
                    demand: d_jt,
                    unit_cost,
                    distance,
                });
            }
        }
    }

    // Facility count: p_min <= Σ open <= p_max.
    let count_terms: Vec<(usize, f64)> = open_vars.iter().map(|&v| (v, 1.0)).collect();
    mip.add_constraint(
        "facility_count_min",
        count_terms.clone(),
        ConstraintSense::Ge,
        params.min_facilities as f64,
    );
    mip.add_constraint(
        "facility_count_max",
        count_terms,
        ConstraintSense::Le,
        params.max_facilities as f64,
    );

    // Mandatory facilities stay open in any feasible solution.
    for (i, fac) in facilities.iter().enumerate() {
        if params.mandatory_facility_ids.contains(fac.as_str()) {
            mip.add_constraint(
                format!("mandatory[{}]", fac),
                vec![(open_vars[i], 1.0)],
                ConstraintSense::Eq,
                1.0,
            );
        }
    }

    // Exactly-one assignment per (destination, year).
    for (t, (year, _)) in demand_by_year.iter().enumerate() {
        for (j, dest) in destinations.iter().enumerate() {
            let terms: Vec<(usize, f64)> = assign_vars
                .iter()
                .filter(|a| a.year_idx == t && a.destination == j)
                .map(|a| (a.var, 1.0))
                .collect();
            mip.add_constraint(
                format!("assign_once[{},{}]", dest, year),
                terms,
                ConstraintSense::Eq,
                1.0,
            );
        }
    }

    // Open-linking: no assignment to a closed facility.
    for a in &assign_vars {
        mip.add_constraint(
            format!(
                "open_link[{},{},{}]",
                facilities[a.facility], destinations[a.destination], demand_by_year[a.year_idx].0
            ),
            vec![(a.var, 1.0), (open_vars[a.facility], -1.0)],
            ConstraintSense::Le,
            0.0,
        );
    }

    // Capacity per (facility, year), active only when open.
    for (t, (year, _)) in demand_by_year.iter().enumerate() {
        for (i, fac) in facilities.iter().enumerate() {
            let capacity = problem.capacity_of(i);
            let mut terms: Vec<(usize, f64)> = assign_vars
                .iter()
                .filter(|a| a.year_idx == t && a.facility == i)
                .map(|a| (a.var, a.demand))
                .collect();
            if terms.is_empty() {
                continue;
            }
            terms.push((open_vars[i], -capacity));
            mip.add_constraint(
                format!("capacity[{},{}]", fac, year),
                terms,
                ConstraintSense::Le,
                0.0,
            );
        }
    }

    // Aggregate service level across the whole horizon (not per year).
    let total_demand: f64 = demand_by_year
        .iter()
        .flat_map(|(_, m)| m.values())
        .sum();
    if params.service_level_requirement > 0.0 && total_demand > 0.0 {
        let terms: Vec<(usize, f64)> = assign_vars
            .iter()
            .filter(|a| a.distance <= params.max_distance_miles)
            .map(|a| (a.var, a.demand))
            .collect();
        mip.add_constraint(
            "service_level",
            terms,
            ConstraintSense::Ge,
            params.service_level_requirement * total_demand,
        );
    }

    debug!(
        variables = mip.num_variables(),
        constraints = mip.num_constraints(),
        years = num_years,
        "built facility network model"
    );

    PlanModel {
        mip,
        open_vars,
        assign_vars,
        years: demand_by_year.iter().map(|(y, _)| *y).collect(),
        demand_by_year: demand_by_year.iter().map(|(_, m)| m.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netplan_core::{CostMatrix, DemandMap, FacilityParams, UNREACHABLE};

    fn demand(units: f64) -> DemandMap {
        let mut m = DemandMap::new();
        m.insert("D1".into(), units);
        m.insert("D2".into(), units);
        m
    }

    fn problem_2x2(params: FacilityParams) -> PlanProblem {
        let matrix = CostMatrix::new(
            vec!["F1".into(), "F2".into()],
            vec!["D1".into(), "D2".into()],
            vec![10.0, 20.0, UNREACHABLE, 5.0],
        )
        .unwrap();
        let mut p = PlanProblem::new(matrix);
        p.params = params;
        p
    }

    #[test]
    fn test_variable_layout() {
        let problem = problem_2x2(FacilityParams::default());
        let years = vec![(2027, demand(100.0)), (2028, demand(120.0))];
        let model = build_model(&problem, &years);

        // 2 open vars + per year: D1 reachable from F1 only, D2 from both.
        assert_eq!(model.open_vars.len(), 2);
        assert_eq!(model.assign_vars.len(), 2 * 3);
        assert_eq!(model.mip.num_variables(), 2 + 6);
        // The unreachable pair (F2, D1) got no variable in either year.
        assert!(!model
            .assign_vars
            .iter()
            .any(|a| a.facility == 1 && a.destination == 0));
    }

    #[test]
    fn test_fixed_cost_charged_per_horizon_year() {
        let params = FacilityParams::default()
            .with_fixed_cost(1000.0)
            .with_weights(2.0, 1.0);
        let problem = problem_2x2(params);
        let years = vec![(2027, demand(100.0)), (2028, demand(100.0)), (2029, demand(100.0))];
        let model = build_model(&problem, &years);

        // weight_cost * fixed_cost * 3 years
        let coef = model.mip.variables[model.open_vars[0]].objective;
        assert!((coef - 6000.0).abs() < 1e-9);
    }

    #[test]
    fn test_service_penalty_applies_beyond_max_distance() {
        // cost_per_mile=1 makes distance == unit_cost. Threshold at 12
        // miles leaves F1->D1 (10) clean and F1->D2 (20) penalized.
        let params = FacilityParams {
            cost_per_mile: 1.0,
            max_distance_miles: 12.0,
            weight_cost: 1.0,
            weight_service_level: 1.0,
            service_penalty_per_unit_mile: 3.0,
            ..FacilityParams::default()
        };
        let problem = problem_2x2(params);
        let years = vec![(2027, demand(10.0))];
        let model = build_model(&problem, &years);

        let clean = model
            .assign_vars
            .iter()
            .find(|a| a.facility == 0 && a.destination == 0)
            .unwrap();
        let penalized = model
            .assign_vars
            .iter()
            .find(|a| a.facility == 0 && a.destination == 1)
            .unwrap();

        // Clean: 10 demand * 10 cost. Penalized: 10*20 + 10*3*(20-12).
        assert!((model.mip.variables[clean.var].objective - 100.0).abs() < 1e-9);
        assert!((model.mip.variables[penalized.var].objective - 440.0).abs() < 1e-9);
    }

    #[test]
    fn test_constraint_inventory() {
        let params = FacilityParams::default().with_mandatory("F2");
        let problem = problem_2x2(params);
        let years = vec![(2027, demand(100.0))];
        let model = build_model(&problem, &years);

        let names: Vec<&str> = model
            .mip
            .constraints
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert!(names.contains(&"facility_count_min"));
        assert!(names.contains(&"facility_count_max"));
        assert!(names.contains(&"mandatory[F2]"));
        assert!(names.contains(&"assign_once[D1,2027]"));
        assert!(names.contains(&"capacity[F1,2027]"));
        assert!(names.contains(&"service_level"));
        // One open-link row per assign variable.
        let links = names.iter().filter(|n| n.starts_with("open_link")).count();
        assert_eq!(links, model.assign_vars.len());
    }

    #[test]
    fn test_service_level_row_aggregates_whole_horizon() {
        // cost_per_mile=1 makes distance == unit_cost. In-range lanes are
        // F1->D1 (10) and F2->D2 (5); F1->D2 (20) is beyond the 12 mile
        // threshold and F2->D1 is unreachable.
        let params = FacilityParams {
            cost_per_mile: 1.0,
            max_distance_miles: 12.0,
            service_level_requirement: 0.9,
            ..FacilityParams::default()
        };
        let problem = problem_2x2(params);
        let years = vec![(2027, demand(100.0)), (2028, demand(200.0))];
        let model = build_model(&problem, &years);

        let row = model
            .mip
            .constraints
            .iter()
            .find(|c| c.name == "service_level")
            .unwrap();
        assert_eq!(row.sense, ConstraintSense::Ge);
        // 0.9 of the 600 units across both years.
        assert!((row.rhs - 540.0).abs() < 1e-9);

        // One in-range lane per year per destination, both years present,
        // each weighted by that year's demand.
        assert_eq!(row.terms.len(), 4);
        let term_coef = |year_idx: usize, facility: usize, destination: usize| {
            let a = model
                .assign_vars
                .iter()
                .find(|a| {
                    a.year_idx == year_idx && a.facility == facility && a.destination == destination
                })
                .unwrap();
            row.terms
                .iter()
                .find(|&&(v, _)| v == a.var)
                .map(|&(_, c)| c)
                .unwrap()
        };
        assert!((term_coef(0, 0, 0) - 100.0).abs() < 1e-9); // F1->D1 2027
        assert!((term_coef(1, 0, 0) - 200.0).abs() < 1e-9); // F1->D1 2028
        assert!((term_coef(1, 1, 1) - 200.0).abs() < 1e-9); // F2->D2 2028
        let out_of_range = model
            .assign_vars
            .iter()
            .find(|a| a.facility == 0 && a.destination == 1)
            .unwrap();
        assert!(!row.terms.iter().any(|&(v, _)| v == out_of_range.var));
    }

    #[test]
    fn test_capacity_terms_carry_demand() {
        let problem = problem_2x2(FacilityParams::default());
        let years = vec![(2027, demand(250.0))];
        let model = build_model(&problem, &years);

        let cap = model
            .mip
            .constraints
            .iter()
            .find(|c| c.name == "capacity[F1,2027]")
            .unwrap();
        // F1 serves both destinations: two demand terms plus the open term.
        assert_eq!(cap.terms.len(), 3);
        assert!(cap.terms.iter().any(|&(_, c)| (c - 250.0).abs() < 1e-9));
        assert!(cap
            .terms
            .iter()
            .any(|&(v, c)| v == model.open_vars[0] && c < 0.0));
    }
}
