//! Unit-cost matrices and facility capacities.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel marking a (facility, destination) pair that cannot be served.
///
/// Pairs carrying this cost get no assignment variable in the model.
pub const UNREACHABLE: f64 = f64::INFINITY;

/// Dense unit-cost table: ordered facility sites (rows) by ordered
/// destinations (columns).
///
/// Row and column identifier lists define the canonical iteration order
/// for model construction and result decoding; demand and capacity maps
/// are looked up against these identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostMatrix {
    facilities: Vec<String>,
    destinations: Vec<String>,
    /// Row-major costs, `facilities.len() * destinations.len()` entries.
    costs: Vec<f64>,
}

impl CostMatrix {
    /// Build a cost matrix, validating that the table is rectangular and
    /// that every finite cost is non-negative.
    pub fn new(
        facilities: Vec<String>,
        destinations: Vec<String>,
        costs: Vec<f64>,
    ) -> CoreResult<Self> {
        if facilities.is_empty() || destinations.is_empty() {
            return Err(CoreError::Validation(
                "cost matrix needs at least one facility and one destination".into(),
            ));
        }
        let expected = facilities.len() * destinations.len();
        if costs.len() != expected {
            return Err(CoreError::Validation(format!(
                "cost matrix is not rectangular: {} facilities x {} destinations requires {} entries, got {}",
                facilities.len(),
                destinations.len(),
                expected,
                costs.len()
            )));
        }
        for (idx, &c) in costs.iter().enumerate() {
            if c.is_nan() || (c.is_finite() && c < 0.0) {
                let i = idx / destinations.len();
                let j = idx % destinations.len();
                return Err(CoreError::Validation(format!(
                    "invalid cost {} for facility '{}' -> destination '{}'",
                    c, facilities[i], destinations[j]
                )));
            }
        }
        Ok(Self {
            facilities,
            destinations,
            costs,
        })
    }

    /// Unit cost from facility row `i` to destination column `j`.
    pub fn cost(&self, i: usize, j: usize) -> f64 {
        self.costs[i * self.destinations.len() + j]
    }

    /// Whether the pair carries a finite cost.
    pub fn is_reachable(&self, i: usize, j: usize) -> bool {
        self.cost(i, j).is_finite()
    }

    pub fn num_facilities(&self) -> usize {
        self.facilities.len()
    }

    pub fn num_destinations(&self) -> usize {
        self.destinations.len()
    }

    /// Ordered facility identifiers (row order).
    pub fn facility_ids(&self) -> &[String] {
        &self.facilities
    }

    /// Ordered destination identifiers (column order).
    pub fn destination_ids(&self) -> &[String] {
        &self.destinations
    }

    /// Row index of a facility identifier, if present.
    pub fn facility_index(&self, id: &str) -> Option<usize> {
        self.facilities.iter().position(|f| f == id)
    }
}

/// Maximum annual throughput per facility site.
///
/// Sites absent from the map fall back to the configured default in
/// [`crate::FacilityParams::max_capacity_per_facility`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapacityMap {
    capacities: HashMap<String, f64>,
}

impl CapacityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, facility: impl Into<String>, capacity: f64) {
        self.capacities.insert(facility.into(), capacity);
    }

    /// Capacity for a facility, or `default` when no explicit entry exists.
    pub fn capacity_or(&self, facility: &str, default: f64) -> f64 {
        self.capacities.get(facility).copied().unwrap_or(default)
    }

    pub fn is_empty(&self) -> bool {
        self.capacities.is_empty()
    }
}

impl FromIterator<(String, f64)> for CapacityMap {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self {
            capacities: iter.into_iter().collect(),
        }
    }
}
