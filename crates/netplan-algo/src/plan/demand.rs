//! Demand scaling across the planning horizon.
//!
//! Turns one baseline demand distribution plus a forecast of annual totals
//! into a per-year demand map, preserving relative destination shares.

use netplan_core::{DemandMap, ForecastYear};
use std::collections::HashMap;
use tracing::debug;

/// Produce one demand map per forecast year.
///
/// Rules, in precedence order:
/// 1. An explicit per-year override is used verbatim.
/// 2. A baseline with positive total is rescaled: each destination keeps
///    its baseline share of the year's forecast total.
/// 3. Otherwise demand splits evenly across the known destinations.
///
/// For every produced year, the destination demands sum to the forecast
/// total within 1e-6 relative tolerance, and no negative demand is
/// produced (validated upstream).
pub fn scale_demand(
    destinations: &[String],
    baseline: Option<&DemandMap>,
    overrides: &HashMap<i32, DemandMap>,
    forecast: &[ForecastYear],
) -> Vec<(i32, DemandMap)> {
    let shares = destination_shares(destinations, baseline);

    forecast
        .iter()
        .map(|fy| {
            if let Some(explicit) = overrides.get(&fy.year) {
                debug!(year = fy.year, "using explicit demand override");
                return (fy.year, explicit.clone());
            }
            let map: DemandMap = destinations
                .iter()
                .zip(&shares)
                .map(|(dest, share)| (dest.clone(), share * fy.demand_units))
                .collect();
            (fy.year, map)
        })
        .collect()
}

/// Relative share of each destination, from the baseline when it has a
/// positive total, evenly otherwise.
fn destination_shares(destinations: &[String], baseline: Option<&DemandMap>) -> Vec<f64> {
    if let Some(base) = baseline {
        let total: f64 = destinations
            .iter()
            .map(|d| base.get(d).copied().unwrap_or(0.0))
            .sum();
        if total > 0.0 {
            return destinations
                .iter()
                .map(|d| base.get(d).copied().unwrap_or(0.0) / total)
                .collect();
        }
    }
    let even = 1.0 / destinations.len() as f64;
    vec![even; destinations.len()]
}
