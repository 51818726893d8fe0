//! Modelos del sistema
//!
//! Este módulo contiene los modelos de dominio: carparks, vehículos y
//! las reservas que cuelgan de cada vehículo.

pub mod location;
pub mod schedule;
pub mod vehicle;

pub use location::{GeoPoint, Location, LocationRef, LocationSummary, Lot, NewLocation};
pub use schedule::{Schedule, TimeWindow};
pub use vehicle::{NewVehicle, Vehicle, VehicleSummary};
