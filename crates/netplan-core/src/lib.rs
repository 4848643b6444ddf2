//! # netplan-core: Data model for facility network planning
//!
//! This crate defines the typed inputs consumed by the netplan optimizer:
//! demand forecasts, unit-cost matrices, facility capacities, and the
//! planning parameters that shape the facility-location model.
//!
//! Ingestion concerns (spreadsheet parsing, column classification) live
//! outside this workspace; everything here is already validated, ordered,
//! and numeric. The optimizer in `netplan-algo` consumes these types
//! directly.

pub mod cost;
pub mod demand;
pub mod error;
pub mod params;

pub use cost::{CapacityMap, CostMatrix, UNREACHABLE};
pub use demand::{validate_forecast, DemandMap, ForecastYear};
pub use error::{CoreError, CoreResult};
pub use params::FacilityParams;
