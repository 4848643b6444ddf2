//! Demand forecasts and per-year demand maps.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Destination identifier mapped to demand units for a single year.
///
/// Iteration order is never relied upon; model construction always walks
/// the ordered destination list of the [`crate::CostMatrix`] and uses this
/// map for lookups only.
pub type DemandMap = HashMap<String, f64>;

/// One year of the demand forecast.
///
/// A forecast is an ordered sequence of these with strictly increasing
/// years. The annual total is redistributed across destinations by the
/// demand scaler in `netplan-algo`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastYear {
    /// Calendar year (e.g. 2027)
    pub year: i32,
    /// Total demand units forecast for this year (non-negative)
    pub demand_units: f64,
}

impl ForecastYear {
    pub fn new(year: i32, demand_units: f64) -> Self {
        Self { year, demand_units }
    }
}

/// Validate a forecast: non-empty, strictly increasing years, no negative
/// totals.
pub fn validate_forecast(forecast: &[ForecastYear]) -> CoreResult<()> {
    if forecast.is_empty() {
        return Err(CoreError::Validation(
            "forecast must contain at least one year".into(),
        ));
    }
    for window in forecast.windows(2) {
        if window[1].year <= window[0].year {
            return Err(CoreError::Validation(format!(
                "forecast years must be strictly increasing: {} follows {}",
                window[1].year, window[0].year
            )));
        }
    }
    for fy in forecast {
        if !fy.demand_units.is_finite() || fy.demand_units < 0.0 {
            return Err(CoreError::Validation(format!(
                "forecast for year {} has invalid demand {}",
                fy.year, fy.demand_units
            )));
        }
    }
    Ok(())
}

/// Sum of all demand in a map.
pub fn total_demand(map: &DemandMap) -> f64 {
    map.values().sum()
}
