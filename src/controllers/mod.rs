//! Controllers
//!
//! Traducen requests HTTP a llamadas de servicio.

pub mod carpark_controller;
