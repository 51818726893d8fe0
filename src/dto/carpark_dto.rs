use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{GeoPoint, LocationRef, Lot, NewLocation, NewVehicle};
use crate::services::SearchQuery;
use crate::utils::errors::{bad_request_error, AppResult};
use crate::utils::validation::validate_not_blank;

// Request de búsqueda de disponibilidad
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchCarparksRequest {
    pub longitude: f64,
    pub latitude: f64,
    pub start: String,
    pub end: String,
    pub radius_km: Option<f64>,
    #[validate(range(min = 1, max = 60))]
    pub min_seats: Option<i32>,
    #[serde(default)]
    pub price_group_ids: Vec<i64>,
    #[serde(default)]
    pub only_available: bool,
}

impl SearchCarparksRequest {
    pub fn into_query(self) -> AppResult<SearchQuery> {
        let mut query = SearchQuery::parse(GeoPoint::new(self.longitude, self.latitude), &self.start, &self.end)?;
        query.radius_km = self.radius_km;
        query.min_seats = self.min_seats;
        query.price_group_ids = self.price_group_ids;
        query.only_available = self.only_available;
        Ok(query)
    }
}

// Request para crear un carpark
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCarparkRequest {
    #[validate(length(max = 100), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(min = 3, max = 12))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default)]
    pub lots: Vec<Lot>,
    #[serde(default)]
    pub has_slashed_vehicle: bool,
}

impl From<CreateCarparkRequest> for NewLocation {
    fn from(request: CreateCarparkRequest) -> Self {
        NewLocation {
            name: request.name,
            postal_code: request.postal_code,
            address: request.address,
            point: GeoPoint::new(request.longitude, request.latitude),
            lots: request.lots,
            has_slashed_vehicle: request.has_slashed_vehicle,
        }
    }
}

// Query string de GET /api/carparks
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarparkLookupQuery {
    pub postal_code: Option<String>,
    pub name: Option<String>,
}

// Request para cambiar el código postal
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostalCodeRequest {
    #[validate(custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(min = 3, max = 12))]
    pub postal_code: String,
}

/// Carpark destino de una operación de flota: por id o por nombre
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarparkTarget {
    pub carpark_id: Option<i64>,
    pub carpark_name: Option<String>,
}

impl CarparkTarget {
    pub fn location_ref(&self) -> AppResult<LocationRef> {
        match (self.carpark_id, &self.carpark_name) {
            (Some(id), _) => Ok(LocationRef::Id(id)),
            (None, Some(name)) if !name.trim().is_empty() => Ok(LocationRef::Name(name.clone())),
            _ => Err(bad_request_error("carparkId or carparkName is required")),
        }
    }
}

// Request para añadir un vehículo
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddVehicleRequest {
    #[serde(flatten)]
    pub target: CarparkTarget,
    #[validate(length(min = 1, max = 50))]
    pub make_name: String,
    #[validate(length(min = 1, max = 50))]
    pub model_name: String,
    #[validate(length(min = 2, max = 12), custom = "validate_not_blank")]
    pub plate_number: String,
    #[validate(range(min = 1, max = 60))]
    pub seats: i32,
    pub price_group_id: Option<i64>,
    pub price_group_name: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl AddVehicleRequest {
    pub fn into_parts(self) -> AppResult<(LocationRef, NewVehicle)> {
        let location = self.target.location_ref()?;
        let vehicle = NewVehicle {
            make_name: self.make_name,
            model_name: self.model_name,
            plate_number: self.plate_number,
            seats: self.seats,
            price_group_id: self.price_group_id,
            price_group_name: self.price_group_name,
            images: self.images,
        };
        Ok((location, vehicle))
    }
}

// Request para eliminar un vehículo por matrícula
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RemoveVehicleRequest {
    #[serde(flatten)]
    pub target: CarparkTarget,
    #[validate(custom = "validate_not_blank")]
    pub plate_number: String,
}

// Request para añadir una reserva
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddScheduleRequest {
    pub carpark_id: i64,
    pub vehicle_id: i64,
    pub booking_id: i64,
    pub start: String,
    pub end: String,
}

// Request para eliminar una reserva
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveScheduleRequest {
    pub carpark_id: i64,
    pub vehicle_id: i64,
    pub booking_id: i64,
}

// Request para comprobar si un vehículo está libre
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckScheduleRequest {
    pub carpark_id: i64,
    pub vehicle_id: i64,
    pub start: String,
    pub end: String,
}

// Request para cambiar los ajustes de búsqueda
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub search_radius_km: f64,
}

// Response con el id asignado
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

// Response de disponibilidad de un vehículo
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityCheckResponse {
    pub vehicle_id: i64,
    pub available: bool,
}

// Response genérica
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
        }
    }
}
