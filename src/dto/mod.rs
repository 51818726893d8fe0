//! DTOs de la API
//!
//! Requests y responses JSON de la capa HTTP.

pub mod carpark_dto;

pub use carpark_dto::ApiResponse;
