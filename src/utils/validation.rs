//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y conversión de tipos.

use chrono::{DateTime, Utc};
use validator::ValidationError;

use crate::models::GeoPoint;
use crate::utils::errors::{AppError, AppResult};

/// Parsear un timestamp RFC 3339 y normalizarlo a UTC
pub fn parse_instant(field: &str, value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::InvalidWindow(format!("{} '{}' is not RFC 3339: {}", field, value, e)))
}

/// Validar coordenadas de búsqueda
pub fn validate_point(point: &GeoPoint) -> AppResult<()> {
    if !point.is_valid() {
        return Err(AppError::BadRequest(format!(
            "invalid coordinates (lon {}, lat {})",
            point.longitude, point.latitude
        )));
    }
    Ok(())
}

/// Validar un radio de búsqueda en kilómetros
pub fn validate_radius_km(radius_km: f64) -> AppResult<()> {
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(AppError::BadRequest(format!(
            "search radius must be a positive number of kilometers, got {}",
            radius_km
        )));
    }
    Ok(())
}

/// Validar que un string no esté vacío (para `#[validate(custom)]`)
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_blank");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}
