//! Services module
//!
//! Este módulo contiene la lógica de negocio del motor de flota. Los
//! servicios reciben el store por handle y encapsulan los límites de
//! tiempo, el log y la traducción de resultados del store a errores.

pub mod availability_service;
pub mod fleet_service;
pub mod geo_index;
pub mod location_service;
pub mod schedule_service;
pub mod setting_service;

pub use availability_service::{AvailabilityService, LocationAvailability, SearchQuery};
pub use fleet_service::FleetService;
pub use geo_index::{GeoIndex, NearbyLocation};
pub use location_service::LocationService;
pub use schedule_service::ScheduleService;
pub use setting_service::{SearchSettings, SettingService};
