//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del motor de flota
//! y su conversión a respuestas HTTP apropiadas.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Schedule conflict: vehicle {vehicle_id} is already booked by booking {existing_booking_id}")]
    ScheduleConflict {
        vehicle_id: i64,
        existing_booking_id: i64,
    },

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),

    #[error("Schedule not found: booking {booking_id} on vehicle {vehicle_id}")]
    ScheduleNotFound { vehicle_id: i64, booking_id: i64 },

    #[error("Duplicate location name: {0}")]
    DuplicateName(String),

    #[error("Duplicate plate {plate_number} in location {location}")]
    DuplicatePlate { location: String, plate_number: String },

    #[error("Duplicate booking {booking_id} on vehicle {vehicle_id}")]
    DuplicateBooking { vehicle_id: i64, booking_id: i64 },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store operation '{operation}' timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::StoreUnavailable(e.to_string())
    }
}

impl AppError {
    /// Código estable que viaja en el cuerpo de la respuesta
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidWindow(_) => "INVALID_WINDOW",
            AppError::ScheduleConflict { .. } => "SCHEDULE_CONFLICT",
            AppError::LocationNotFound(_) => "LOCATION_NOT_FOUND",
            AppError::VehicleNotFound(_) => "VEHICLE_NOT_FOUND",
            AppError::ScheduleNotFound { .. } => "SCHEDULE_NOT_FOUND",
            AppError::DuplicateName(_) => "DUPLICATE_NAME",
            AppError::DuplicatePlate { .. } => "DUPLICATE_PLATE",
            AppError::DuplicateBooking { .. } => "DUPLICATE_BOOKING",
            AppError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AppError::Timeout { .. } => "TIMEOUT",
            AppError::Cancelled => "CANCELLED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidWindow(_) | AppError::Validation(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::LocationNotFound(_)
            | AppError::VehicleNotFound(_)
            | AppError::ScheduleNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::ScheduleConflict { .. }
            | AppError::DuplicateName(_)
            | AppError::DuplicatePlate { .. }
            | AppError::DuplicateBooking { .. } => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            // 499: el cliente cerró la petición
            AppError::Cancelled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::REQUEST_TIMEOUT)
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match &self {
            AppError::StoreUnavailable(msg) => {
                error!("❌ Store no disponible: {}", msg);
                (
                    "The fleet store is temporarily unavailable".to_string(),
                    Some(json!({ "store_error": msg })),
                )
            }
            AppError::Internal(msg) => {
                error!("❌ Error interno: {}", msg);
                (
                    "An unexpected error occurred".to_string(),
                    Some(json!({ "internal_error": msg })),
                )
            }
            AppError::Validation(e) => {
                warn!("⚠️ Error de validación: {}", e);
                ("The provided data is invalid".to_string(), Some(json!(e)))
            }
            AppError::ScheduleConflict {
                vehicle_id,
                existing_booking_id,
            } => (
                self.to_string(),
                Some(json!({
                    "vehicle_id": vehicle_id,
                    "existing_booking_id": existing_booking_id,
                })),
            ),
            other => {
                warn!("⚠️ {}", other);
                (other.to_string(), None)
            }
        };

        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Client Closed Request")
                .to_string(),
            message,
            details,
            code,
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de carpark no encontrado
pub fn location_not_found(key: impl std::fmt::Display) -> AppError {
    AppError::LocationNotFound(format!("location {} does not exist", key))
}

/// Función helper para crear errores de vehículo no encontrado
pub fn vehicle_not_found(location: impl std::fmt::Display, vehicle: impl std::fmt::Display) -> AppError {
    AppError::VehicleNotFound(format!("vehicle {} not found in location {}", vehicle, location))
}

/// Función helper para crear errores de solicitud incorrecta
pub fn bad_request_error(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}
