//! Planning parameters for the facility-location model.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Parameters shaping the facility-location model.
///
/// Every field has a default, so partial configuration is valid. Weights
/// need not sum to one; they scale the cost and service-penalty terms of
/// the objective independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityParams {
    /// Fixed lease cost per facility, charged once per horizon-year once
    /// the facility is opened ($/year).
    pub fixed_cost_per_facility: f64,
    /// Transport cost per mile, used to derive distance from unit cost
    /// when no explicit distance is supplied ($/mile).
    pub cost_per_mile: f64,
    /// Required fraction of demand served within `max_distance_miles`,
    /// aggregated over the whole horizon. In [0, 1].
    pub service_level_requirement: f64,
    /// Service distance threshold (miles).
    pub max_distance_miles: f64,
    /// Minimum number of facilities to open.
    pub min_facilities: usize,
    /// Maximum number of facilities to open.
    pub max_facilities: usize,
    /// Default annual throughput when a facility has no explicit capacity.
    pub max_capacity_per_facility: f64,
    /// Facilities that must be open in any feasible solution.
    pub mandatory_facility_ids: HashSet<String>,
    /// Objective weight on fixed + transport cost (>= 0).
    pub weight_cost: f64,
    /// Objective weight on the service-distance penalty (>= 0).
    pub weight_service_level: f64,
    /// Penalty per unit-mile of demand shipped beyond the service
    /// distance ($/unit-mile).
    pub service_penalty_per_unit_mile: f64,
}

impl Default for FacilityParams {
    fn default() -> Self {
        Self {
            fixed_cost_per_facility: 100_000.0,
            cost_per_mile: 2.0,
            service_level_requirement: 0.95,
            max_distance_miles: 500.0,
            min_facilities: 1,
            max_facilities: 10,
            max_capacity_per_facility: 1_000_000.0,
            mandatory_facility_ids: HashSet::new(),
            weight_cost: 1.0,
            weight_service_level: 1.0,
            service_penalty_per_unit_mile: 10.0,
        }
    }
}

impl FacilityParams {
    pub fn with_fixed_cost(mut self, cost: f64) -> Self {
        self.fixed_cost_per_facility = cost;
        self
    }

    pub fn with_cost_per_mile(mut self, cost: f64) -> Self {
        self.cost_per_mile = cost;
        self
    }

    pub fn with_service_level(mut self, requirement: f64, max_distance_miles: f64) -> Self {
        self.service_level_requirement = requirement;
        self.max_distance_miles = max_distance_miles;
        self
    }

    pub fn with_facility_count(mut self, min: usize, max: usize) -> Self {
        self.min_facilities = min;
        self.max_facilities = max;
        self
    }

    pub fn with_default_capacity(mut self, capacity: f64) -> Self {
        self.max_capacity_per_facility = capacity;
        self
    }

    pub fn with_mandatory(mut self, facility: impl Into<String>) -> Self {
        self.mandatory_facility_ids.insert(facility.into());
        self
    }

    pub fn with_weights(mut self, cost: f64, service_level: f64) -> Self {
        self.weight_cost = cost;
        self.weight_service_level = service_level;
        self
    }

    /// Check internal consistency of the parameters.
    pub fn validate(&self) -> CoreResult<()> {
        if self.min_facilities > self.max_facilities {
            return Err(CoreError::Validation(format!(
                "min_facilities={} exceeds max_facilities={}",
                self.min_facilities, self.max_facilities
            )));
        }
        if !(0.0..=1.0).contains(&self.service_level_requirement) {
            return Err(CoreError::Validation(format!(
                "service_level_requirement={} must be within [0, 1]",
                self.service_level_requirement
            )));
        }
        if self.cost_per_mile <= 0.0 || !self.cost_per_mile.is_finite() {
            return Err(CoreError::Validation(format!(
                "cost_per_mile={} must be positive",
                self.cost_per_mile
            )));
        }
        if self.weight_cost < 0.0 || self.weight_service_level < 0.0 {
            return Err(CoreError::Validation(format!(
                "objective weights must be non-negative (cost={}, service={})",
                self.weight_cost, self.weight_service_level
            )));
        }
        if self.fixed_cost_per_facility < 0.0 {
            return Err(CoreError::Validation(format!(
                "fixed_cost_per_facility={} must be non-negative",
                self.fixed_cost_per_facility
            )));
        }
        if self.max_distance_miles < 0.0 {
            return Err(CoreError::Validation(format!(
                "max_distance_miles={} must be non-negative",
                self.max_distance_miles
            )));
        }
        if self.max_capacity_per_facility <= 0.0 {
            return Err(CoreError::Validation(format!(
                "max_capacity_per_facility={} must be positive",
                self.max_capacity_per_facility
            )));
        }
        Ok(())
    }
}
