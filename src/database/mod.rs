//! Módulo de base de datos
//!
//! Maneja la conexión y el esquema de PostgreSQL

pub mod connection;
pub mod schema;

pub use connection::connect;
pub use schema::ensure_schema;
