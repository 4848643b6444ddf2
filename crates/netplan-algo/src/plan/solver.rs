//! Planning pipeline: validate, scale, build, guard, solve, decode.

use super::demand::scale_demand;
use super::model::{build_model, PlanModel};
use super::problem::PlanProblem;
use super::solution::{
    Assignment, FacilityMetrics, MultiYearPlan, NetworkMetrics, YearPlan,
};
use netplan_core::{validate_forecast, DemandMap};
use netplan_solver_common::{
    ClarabelBackend, LimitBreach, MipSolution, ModelLimits, SolutionStatus, SolverBackend,
    SolverError, SolverProcess, SupervisorConfig,
};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Errors from the planning pipeline.
///
/// Infeasibility is a first-class outcome with its own variant, not a
/// generic failure: a model that proves no feasible network exists has
/// done its job.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("model complexity exceeded: {0}")]
    ComplexityExceeded(#[from] LimitBreach),

    #[error("infeasible: {0}")]
    Infeasible(String),

    #[error("execution failure: {0}")]
    Execution(#[from] SolverError),
}

/// Where the solve runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Solve inside the calling process with the built-in backend.
    #[default]
    InProcess,
    /// Solve in a supervised worker subprocess with wall-clock and
    /// memory ceilings.
    Isolated,
}

/// Per-invocation solver configuration.
#[derive(Debug, Clone, Default)]
pub struct PlanSolverConfig {
    /// Model complexity ceilings checked before any solver runs.
    pub limits: ModelLimits,
    /// Resource ceilings for isolated execution.
    pub supervisor: SupervisorConfig,
    pub execution: ExecutionMode,
}

/// Solve a planning problem end to end.
pub fn solve_plan(
    problem: &PlanProblem,
    config: &PlanSolverConfig,
) -> Result<MultiYearPlan, PlanError> {
    let model = prepare(problem, &config.limits)?;

    let solution = match config.execution {
        ExecutionMode::InProcess => ClarabelBackend.solve(&model.mip)?,
        ExecutionMode::Isolated => {
            let binary = SolverProcess::find_binary()?;
            SolverProcess::new(binary, config.supervisor.clone()).solve_blocking(&model.mip)?
        }
    };

    finish(problem, &model, solution)
}

/// Solve with a caller-supplied backend.
///
/// Used for exact-MILP backends and for tests that substitute a mock.
pub fn solve_plan_with_backend(
    problem: &PlanProblem,
    limits: &ModelLimits,
    backend: &dyn SolverBackend,
) -> Result<MultiYearPlan, PlanError> {
    let model = prepare(problem, limits)?;
    info!(backend = backend.name(), "solving plan");
    let solution = backend.solve(&model.mip)?;
    finish(problem, &model, solution)
}

/// Validate inputs, scale demand, build the MIP, and check it against the
/// complexity ceilings. No solver runs past this point unless the model
/// fits.
fn prepare(problem: &PlanProblem, limits: &ModelLimits) -> Result<PlanModel, PlanError> {
    validate(problem)?;

    let destinations = problem.cost_matrix.destination_ids().to_vec();
    let demand_by_year = scale_demand(
        &destinations,
        problem.baseline_demand.as_ref(),
        &problem.demand_overrides,
        &problem.forecast,
    );

    let model = build_model(problem, &demand_by_year);
    limits.check(&model.mip)?;
    Ok(model)
}

fn validate(problem: &PlanProblem) -> Result<(), PlanError> {
    problem
        .params
        .validate()
        .map_err(|e| PlanError::Validation(e.to_string()))?;
    validate_forecast(&problem.forecast).map_err(|e| PlanError::Validation(e.to_string()))?;

    let num_candidates = problem.num_candidates();
    if problem.params.min_facilities > num_candidates {
        return Err(PlanError::Validation(format!(
            "min_facilities={} exceeds {} candidate sites",
            problem.params.min_facilities, num_candidates
        )));
    }

    let facility_ids: HashSet<&str> = problem
        .cost_matrix
        .facility_ids()
        .iter()
        .map(String::as_str)
        .collect();
    for mandatory in &problem.params.mandatory_facility_ids {
        if !facility_ids.contains(mandatory.as_str()) {
            return Err(PlanError::Validation(format!(
                "mandatory facility '{}' is not a candidate site",
                mandatory
            )));
        }
    }
    if problem.params.mandatory_facility_ids.len() > problem.params.max_facilities {
        return Err(PlanError::Validation(format!(
            "{} mandatory facilities exceed max_facilities={}",
            problem.params.mandatory_facility_ids.len(),
            problem.params.max_facilities
        )));
    }

    let destination_ids: HashSet<&str> = problem
        .cost_matrix
        .destination_ids()
        .iter()
        .map(String::as_str)
        .collect();
    if let Some(baseline) = &problem.baseline_demand {
        validate_demand_map(baseline, &destination_ids, "baseline demand")?;
    }
    for (year, map) in &problem.demand_overrides {
        validate_demand_map(map, &destination_ids, &format!("demand override for {}", year))?;
    }

    for (j, dest) in problem.cost_matrix.destination_ids().iter().enumerate() {
        let reachable = (0..num_candidates).any(|i| problem.cost_matrix.is_reachable(i, j));
        if !reachable {
            return Err(PlanError::Validation(format!(
                "destination '{}' is unreachable from every candidate site",
                dest
            )));
        }
    }

    Ok(())
}

fn validate_demand_map(
    map: &DemandMap,
    known: &HashSet<&str>,
    what: &str,
) -> Result<(), PlanError> {
    for (dest, units) in map {
        if !known.contains(dest.as_str()) {
            return Err(PlanError::Validation(format!(
                "{} names unknown destination '{}'",
                what, dest
            )));
        }
        if !units.is_finite() || *units < 0.0 {
            return Err(PlanError::Validation(format!(
                "{} has invalid demand {} for '{}'",
                what, units, dest
            )));
        }
    }
    Ok(())
}

/// Decode the raw solution into a plan, or map a non-optimal status to
/// the matching error.
fn finish(
    problem: &PlanProblem,
    model: &PlanModel,
    solution: MipSolution,
) -> Result<MultiYearPlan, PlanError> {
    match solution.status {
        SolutionStatus::Optimal => {
            verify_solution(problem, model, &solution)?;
            Ok(compile(problem, model, &solution))
        }
        SolutionStatus::Infeasible => Err(PlanError::Infeasible(
            solution
                .error_message
                .unwrap_or_else(|| "no feasible facility network exists".into()),
        )),
        status => Err(PlanError::Execution(SolverError::Backend(format!(
            "solver returned {}: {}",
            status,
            solution.error_message.as_deref().unwrap_or("no detail")
        )))),
    }
}

/// Rounding threshold for relaxed binary values.
const DECISION_THRESHOLD: f64 = 0.5;

/// Maximum distance from an integer a decision value may carry and still
/// be trusted by the decoder.
const INTEGRALITY_TOLERANCE: f64 = 1e-3;

/// Reject an optimal solution the decoder cannot trust.
///
/// The relaxation backend reports optimal for fractional vertices too; a
/// symmetric instance can put every decision at 1/2 or 1/3, which the 0.5
/// threshold would decode into a plan violating the count and
/// exactly-one-assignment guarantees. Such solutions surface as execution
/// failures, never as plans.
fn verify_solution(
    problem: &PlanProblem,
    model: &PlanModel,
    solution: &MipSolution,
) -> Result<(), PlanError> {
    let backend_err = |msg: String| PlanError::Execution(SolverError::Backend(msg));

    if solution.values.len() != model.mip.num_variables() {
        return Err(backend_err(format!(
            "solver returned {} values for a model with {} variables",
            solution.values.len(),
            model.mip.num_variables()
        )));
    }

    let integral = |v: f64| v < INTEGRALITY_TOLERANCE || v > 1.0 - INTEGRALITY_TOLERANCE;
    for (i, &var) in model.open_vars.iter().enumerate() {
        let v = solution.values[var];
        if !integral(v) {
            return Err(backend_err(format!(
                "relaxation left open[{}] fractional at {:.4}; no integral optimum was found",
                problem.cost_matrix.facility_ids()[i],
                v
            )));
        }
    }
    for a in &model.assign_vars {
        let v = solution.values[a.var];
        if !integral(v) {
            return Err(backend_err(format!(
                "relaxation left assign[{},{},{}] fractional at {:.4}; no integral optimum was found",
                problem.cost_matrix.facility_ids()[a.facility],
                problem.cost_matrix.destination_ids()[a.destination],
                model.years[a.year_idx],
                v
            )));
        }
    }

    let open_count = model
        .open_vars
        .iter()
        .filter(|&&var| solution.values[var] > DECISION_THRESHOLD)
        .count();
    if open_count < problem.params.min_facilities || open_count > problem.params.max_facilities {
        return Err(backend_err(format!(
            "decoded {} open facilities outside the required [{}, {}] range",
            open_count, problem.params.min_facilities, problem.params.max_facilities
        )));
    }

    for (t, &year) in model.years.iter().enumerate() {
        for (j, dest) in problem.cost_matrix.destination_ids().iter().enumerate() {
            let assigned = model
                .assign_vars
                .iter()
                .filter(|a| {
                    a.year_idx == t
                        && a.destination == j
                        && solution.values[a.var] > DECISION_THRESHOLD
                })
                .count();
            if assigned != 1 {
                return Err(backend_err(format!(
                    "destination '{}' has {} assignments in {}, expected exactly one",
                    dest, assigned, year
                )));
            }
        }
    }

    Ok(())
}

fn compile(problem: &PlanProblem, model: &PlanModel, solution: &MipSolution) -> MultiYearPlan {
    let facilities = problem.cost_matrix.facility_ids();
    let destinations = problem.cost_matrix.destination_ids();
    let params = &problem.params;

    let open_rows: Vec<usize> = model
        .open_vars
        .iter()
        .enumerate()
        .filter(|&(_, &var)| solution.values[var] > DECISION_THRESHOLD)
        .map(|(i, _)| i)
        .collect();
    let open_facilities: Vec<String> = open_rows.iter().map(|&i| facilities[i].clone()).collect();

    let mut years = Vec::with_capacity(model.years.len());
    for (t, &year) in model.years.iter().enumerate() {
        let assignments: Vec<Assignment> = model
            .assign_vars
            .iter()
            .filter(|a| a.year_idx == t && solution.values[a.var] > DECISION_THRESHOLD)
            .map(|a| Assignment {
                facility: facilities[a.facility].clone(),
                destination: destinations[a.destination].clone(),
                demand: a.demand,
                unit_cost: a.unit_cost,
                distance: a.distance,
            })
            .collect();

        let facility_metrics: Vec<FacilityMetrics> = open_rows
            .iter()
            .map(|&i| {
                let id = &facilities[i];
                let served: Vec<&Assignment> =
                    assignments.iter().filter(|a| &a.facility == id).collect();
                let demand_served: f64 = served.iter().map(|a| a.demand).sum();
                let capacity = problem.capacity_of(i);
                let transport: f64 = served.iter().map(|a| a.demand * a.unit_cost).sum();
                let total_cost = params.fixed_cost_per_facility + transport;
                let avg_distance = if demand_served > 0.0 {
                    served.iter().map(|a| a.demand * a.distance).sum::<f64>() / demand_served
                } else {
                    0.0
                };
                FacilityMetrics {
                    facility: id.clone(),
                    destinations_served: served.len(),
                    demand_served,
                    capacity,
                    utilization: if capacity > 0.0 { demand_served / capacity } else { 0.0 },
                    avg_distance,
                    total_cost,
                    cost_per_unit: if demand_served > 0.0 {
                        total_cost / demand_served
                    } else {
                        0.0
                    },
                }
            })
            .collect();

        let total_demand: f64 = model.demand_by_year[t].values().sum();
        let in_range: f64 = assignments
            .iter()
            .filter(|a| a.distance <= params.max_distance_miles)
            .map(|a| a.demand)
            .sum();
        let assigned: f64 = assignments.iter().map(|a| a.demand).sum();
        let avg_distance = if assigned > 0.0 {
            assignments.iter().map(|a| a.demand * a.distance).sum::<f64>() / assigned
        } else {
            0.0
        };
        let avg_utilization = if facility_metrics.is_empty() {
            0.0
        } else {
            facility_metrics.iter().map(|m| m.utilization).sum::<f64>()
                / facility_metrics.len() as f64
        };

        let network = NetworkMetrics {
            service_level: if total_demand > 0.0 { in_range / total_demand } else { 0.0 },
            avg_distance,
            avg_utilization,
            total_cost: facility_metrics.iter().map(|m| m.total_cost).sum(),
            total_capacity: facility_metrics.iter().map(|m| m.capacity).sum(),
            total_demand,
        };

        years.push(YearPlan {
            year,
            open_facilities: open_facilities.clone(),
            assignments,
            facility_metrics,
            network,
        });
    }

    info!(
        open = open_facilities.len(),
        years = years.len(),
        objective = solution.objective,
        "plan compiled"
    );

    MultiYearPlan::aggregate(
        years,
        open_facilities,
        solution.objective,
        Duration::from_millis(solution.solve_time_ms.max(0) as u64),
        solution.peak_memory_mb,
        solution.status.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanProblemBuilder;
    use netplan_core::{CapacityMap, CostMatrix, FacilityParams, UNREACHABLE};
    use netplan_solver_common::SolverResult;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// 3 candidate sites, 4 destinations. F1 is strictly cheapest to every
    /// destination with ample capacity, so a cost-minimal network opens F1
    /// alone.
    fn dominant_f1_problem() -> PlanProblem {
        let matrix = CostMatrix::new(
            vec!["F1".into(), "F2".into(), "F3".into()],
            vec!["D1".into(), "D2".into(), "D3".into(), "D4".into()],
            vec![
                10.0, 12.0, 8.0, 14.0, // F1
                40.0, 35.0, 50.0, 45.0, // F2
                60.0, UNREACHABLE, 70.0, 65.0, // F3
            ],
        )
        .unwrap();

        let mut caps = CapacityMap::new();
        caps.set("F1", 10_000.0);

        PlanProblemBuilder::new(matrix)
            .capacities(caps)
            .forecast_year(2027, 2000.0)
            .forecast_year(2028, 2000.0)
            .params(
                FacilityParams::default()
                    .with_fixed_cost(1000.0)
                    .with_cost_per_mile(1.0)
                    .with_service_level(0.95, 100.0)
                    .with_facility_count(1, 3),
            )
            .build()
    }

    #[test]
    fn test_optimal_plan_opens_dominant_facility() {
        let problem = dominant_f1_problem();
        let plan = solve_plan(&problem, &PlanSolverConfig::default()).unwrap();

        assert_eq!(plan.open_facilities, vec!["F1".to_string()]);
        assert_eq!(plan.years.len(), 2);
        for year in &plan.years {
            assert_eq!(year.assignments.len(), 4);
            assert!(year.assignments.iter().all(|a| a.facility == "F1"));
            // Every distance is under the 100 mile threshold.
            assert!((year.network.service_level - 1.0).abs() < 1e-6);
        }

        // 500 units to each destination per year: transport 500 * 44,
        // lease 1000 per year. Horizon total 2 * 23000.
        assert!(
            (plan.total_cost - 46_000.0).abs() / 46_000.0 < 1e-2,
            "total cost {}",
            plan.total_cost
        );
        assert!((plan.objective - 46_000.0).abs() / 46_000.0 < 1e-2);
        assert!((plan.service_level - 1.0).abs() < 1e-6);

        let text = plan.summary();
        assert!(text.contains("Open facilities: 1 (F1)"));
    }

    #[test]
    fn test_facility_metrics_math() {
        let problem = dominant_f1_problem();
        let plan = solve_plan(&problem, &PlanSolverConfig::default()).unwrap();

        let fm = &plan.years[0].facility_metrics[0];
        assert_eq!(fm.facility, "F1");
        assert_eq!(fm.destinations_served, 4);
        assert!((fm.demand_served - 2000.0).abs() < 1.0);
        assert!((fm.utilization - 0.2).abs() < 1e-3);
        // Demand-weighted average of 10, 12, 8, 14 at equal demand.
        assert!((fm.avg_distance - 11.0).abs() < 0.1);
        assert!((fm.total_cost - 23_000.0).abs() < 50.0);
    }

    #[test]
    fn test_capacity_shortfall_is_infeasible() {
        // One facility allowed, 500 units of capacity, 4000 units of
        // demand. No network exists.
        let matrix = CostMatrix::new(
            vec!["F1".into(), "F2".into()],
            vec!["D1".into(), "D2".into()],
            vec![10.0, 12.0, 11.0, 13.0],
        )
        .unwrap();
        let problem = PlanProblemBuilder::new(matrix)
            .forecast_year(2027, 4000.0)
            .params(
                FacilityParams::default()
                    .with_facility_count(1, 1)
                    .with_default_capacity(500.0)
                    .with_service_level(0.0, 500.0),
            )
            .build();

        let err = solve_plan(&problem, &PlanSolverConfig::default()).unwrap_err();
        assert!(matches!(err, PlanError::Infeasible(_)));
    }

    #[test]
    fn test_mandatory_facility_is_opened() {
        // F2 is costlier everywhere but mandatory, and the count ceiling
        // of one keeps the cheap site closed.
        let matrix = CostMatrix::new(
            vec!["F1".into(), "F2".into()],
            vec!["D1".into(), "D2".into()],
            vec![10.0, 12.0, 30.0, 35.0],
        )
        .unwrap();
        let problem = PlanProblemBuilder::new(matrix)
            .forecast_year(2027, 1000.0)
            .params(
                FacilityParams::default()
                    .with_cost_per_mile(1.0)
                    .with_service_level(0.5, 100.0)
                    .with_facility_count(1, 1)
                    .with_mandatory("F2"),
            )
            .build();

        let plan = solve_plan(&problem, &PlanSolverConfig::default()).unwrap();
        assert_eq!(plan.open_facilities, vec!["F2".to_string()]);
        assert!(plan.years[0].assignments.iter().all(|a| a.facility == "F2"));
    }

    /// Backend that records whether it was invoked.
    struct TrippedBackend(AtomicBool);

    impl SolverBackend for TrippedBackend {
        fn name(&self) -> &'static str {
            "tripped"
        }
        fn solve(&self, _problem: &netplan_solver_common::MipProblem) -> SolverResult<MipSolution> {
            self.0.store(true, Ordering::SeqCst);
            Ok(MipSolution::error("should never run"))
        }
    }

    #[test]
    fn test_complexity_guard_blocks_before_solve() {
        let problem = dominant_f1_problem();
        let limits = ModelLimits {
            max_variables: 3,
            ..ModelLimits::default()
        };
        let backend = TrippedBackend(AtomicBool::new(false));

        let err = solve_plan_with_backend(&problem, &limits, &backend).unwrap_err();
        assert!(matches!(err, PlanError::ComplexityExceeded(_)));
        assert!(!backend.0.load(Ordering::SeqCst), "backend must not run");
    }

    #[test]
    fn test_symmetric_instance_is_rejected_not_misdecoded() {
        // Three identical sites serving one destination: the relaxation's
        // optimal face holds every split, and the interior-point solution
        // lands at 1/3 everywhere. Decoding that with a 0.5 threshold
        // would open zero facilities and assign nothing, so the solve must
        // fail instead of reporting such a plan.
        let matrix = CostMatrix::new(
            vec!["S1".into(), "S2".into(), "S3".into()],
            vec!["D1".into()],
            vec![10.0, 10.0, 10.0],
        )
        .unwrap();
        let problem = PlanProblemBuilder::new(matrix)
            .forecast_year(2027, 900.0)
            .params(
                FacilityParams::default()
                    .with_fixed_cost(1000.0)
                    .with_facility_count(1, 3),
            )
            .build();

        let err = solve_plan(&problem, &PlanSolverConfig::default()).unwrap_err();
        match err {
            PlanError::Execution(inner) => {
                assert!(inner.to_string().contains("fractional"), "got: {}", inner)
            }
            other => panic!("expected Execution, got {:?}", other),
        }
    }

    /// Backend that claims optimality but returns no values.
    struct ShortVectorBackend;

    impl SolverBackend for ShortVectorBackend {
        fn name(&self) -> &'static str {
            "short"
        }
        fn solve(&self, _problem: &netplan_solver_common::MipProblem) -> SolverResult<MipSolution> {
            Ok(MipSolution::optimal(0.0, Vec::new(), 1))
        }
    }

    #[test]
    fn test_truncated_value_vector_is_rejected() {
        let problem = dominant_f1_problem();
        let err =
            solve_plan_with_backend(&problem, &ModelLimits::default(), &ShortVectorBackend)
                .unwrap_err();
        match err {
            PlanError::Execution(inner) => {
                assert!(inner.to_string().contains("values"), "got: {}", inner)
            }
            other => panic!("expected Execution, got {:?}", other),
        }
    }

    #[test]
    fn test_min_facilities_beyond_candidates_rejected() {
        let mut problem = dominant_f1_problem();
        problem.params = problem.params.with_facility_count(5, 8);

        let err = solve_plan(&problem, &PlanSolverConfig::default()).unwrap_err();
        match err {
            PlanError::Validation(msg) => {
                assert!(msg.contains("min_facilities=5 exceeds 3 candidate sites"))
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_mandatory_facility_rejected() {
        let mut problem = dominant_f1_problem();
        problem.params = problem.params.with_mandatory("F9");

        let err = solve_plan(&problem, &PlanSolverConfig::default()).unwrap_err();
        assert!(matches!(err, PlanError::Validation(_)));
    }

    #[test]
    fn test_unreachable_destination_rejected() {
        let matrix = CostMatrix::new(
            vec!["F1".into()],
            vec!["D1".into(), "D2".into()],
            vec![10.0, UNREACHABLE],
        )
        .unwrap();
        let problem = PlanProblemBuilder::new(matrix).forecast_year(2027, 100.0).build();

        let err = solve_plan(&problem, &PlanSolverConfig::default()).unwrap_err();
        match err {
            PlanError::Validation(msg) => assert!(msg.contains("'D2'")),
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_override_with_unknown_destination_rejected() {
        let mut problem = dominant_f1_problem();
        let mut map = DemandMap::new();
        map.insert("D99".into(), 10.0);
        problem.demand_overrides.insert(2027, map);

        let err = solve_plan(&problem, &PlanSolverConfig::default()).unwrap_err();
        assert!(matches!(err, PlanError::Validation(_)));
    }

    #[test]
    fn test_empty_forecast_rejected() {
        let matrix = CostMatrix::new(vec!["F1".into()], vec!["D1".into()], vec![10.0]).unwrap();
        let problem = PlanProblemBuilder::new(matrix).build();

        let err = solve_plan(&problem, &PlanSolverConfig::default()).unwrap_err();
        assert!(matches!(err, PlanError::Validation(_)));
    }

    #[test]
    fn test_solve_is_deterministic() {
        let problem = dominant_f1_problem();
        let a = solve_plan(&problem, &PlanSolverConfig::default()).unwrap();
        let b = solve_plan(&problem, &PlanSolverConfig::default()).unwrap();
        assert_eq!(a.open_facilities, b.open_facilities);
        assert!((a.total_cost - b.total_cost).abs() < 1e-6);
    }
}
