//! Motor de disponibilidad y reservas de una flota de vehículos compartidos
//!
//! Los carparks alojan vehículos; cada vehículo lleva sus reservas. La API
//! HTTP es una capa delgada sobre los servicios de `services`.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use state::AppState;
pub use utils::errors::{AppError, AppResult};
