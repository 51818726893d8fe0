use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::dto::carpark_dto::{
    AddScheduleRequest, AddVehicleRequest, ApiResponse, AvailabilityCheckResponse,
    CarparkLookupQuery, CheckScheduleRequest, CreateCarparkRequest, CreatedResponse,
    RemoveScheduleRequest, RemoveVehicleRequest, SearchCarparksRequest, UpdatePostalCodeRequest,
};
use crate::models::{Location, LocationSummary, Schedule, TimeWindow, Vehicle};
use crate::services::LocationAvailability;
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, AppError};

pub struct CarparkController {
    state: AppState,
}

impl CarparkController {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn search(
        &self,
        request: SearchCarparksRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse<Vec<LocationAvailability>>, AppError> {
        request.validate()?;
        let query = request.into_query()?;
        let results = self.state.availability().search(&query, cancel).await?;
        Ok(ApiResponse::success(results))
    }

    pub async fn create(
        &self,
        request: CreateCarparkRequest,
    ) -> Result<ApiResponse<CreatedResponse>, AppError> {
        request.validate()?;
        let id = self.state.locations().create_location(request.into()).await?;
        Ok(ApiResponse::success_with_message(
            CreatedResponse { id },
            "Carpark creado exitosamente".to_string(),
        ))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Location, AppError> {
        self.state.locations().get_location(id).await
    }

    /// Buscar por código postal o por nombre; sin filtros lista todos
    pub async fn lookup(&self, query: CarparkLookupQuery) -> Result<Vec<LocationSummary>, AppError> {
        let locations = self.state.locations();
        match (query.postal_code, query.name) {
            (Some(_), Some(_)) => Err(bad_request_error("use either postalCode or name, not both")),
            (Some(postal_code), None) => Ok(vec![locations.find_by_postal_code(&postal_code).await?.summary()]),
            (None, Some(name)) => Ok(vec![locations.find_by_name(&name).await?.summary()]),
            (None, None) => locations.list_locations().await,
        }
    }

    pub async fn remove(&self, id: i64) -> Result<ApiResponse<LocationSummary>, AppError> {
        let removed = self.state.locations().remove_location(id).await?;
        Ok(ApiResponse::success_with_message(
            removed.summary(),
            "Carpark eliminado exitosamente".to_string(),
        ))
    }

    pub async fn update_postal_code(
        &self,
        request: UpdatePostalCodeRequest,
    ) -> Result<ApiResponse<()>, AppError> {
        request.validate()?;
        self.state
            .locations()
            .update_postal_code(&request.name, &request.postal_code)
            .await?;
        Ok(ApiResponse::success_with_message(
            (),
            "Código postal actualizado".to_string(),
        ))
    }

    pub async fn add_vehicle(
        &self,
        request: AddVehicleRequest,
    ) -> Result<ApiResponse<CreatedResponse>, AppError> {
        request.validate()?;
        let (location, vehicle) = request.into_parts()?;
        let id = self.state.fleet().add_vehicle(location, vehicle).await?;
        Ok(ApiResponse::success_with_message(
            CreatedResponse { id },
            "Vehículo añadido exitosamente".to_string(),
        ))
    }

    pub async fn remove_vehicle(
        &self,
        request: RemoveVehicleRequest,
    ) -> Result<ApiResponse<Vehicle>, AppError> {
        request.validate()?;
        let location = request.target.location_ref()?;
        let removed = self
            .state
            .fleet()
            .remove_vehicle(location, &request.plate_number)
            .await?;
        Ok(ApiResponse::success_with_message(
            removed,
            "Vehículo eliminado exitosamente".to_string(),
        ))
    }

    pub async fn add_schedule(
        &self,
        request: AddScheduleRequest,
    ) -> Result<ApiResponse<Schedule>, AppError> {
        let window = TimeWindow::parse(&request.start, &request.end)?;
        let schedule = self
            .state
            .schedules()
            .add(request.carpark_id, request.vehicle_id, window, request.booking_id)
            .await?;
        Ok(ApiResponse::success_with_message(
            schedule,
            "Reserva creada exitosamente".to_string(),
        ))
    }

    pub async fn remove_schedule(
        &self,
        request: RemoveScheduleRequest,
    ) -> Result<ApiResponse<Schedule>, AppError> {
        let schedule = self
            .state
            .schedules()
            .remove(request.carpark_id, request.vehicle_id, request.booking_id)
            .await?;
        Ok(ApiResponse::success_with_message(
            schedule,
            "Reserva eliminada exitosamente".to_string(),
        ))
    }

    pub async fn check_schedule(
        &self,
        request: CheckScheduleRequest,
    ) -> Result<AvailabilityCheckResponse, AppError> {
        let window = TimeWindow::parse(&request.start, &request.end)?;
        let available = self
            .state
            .schedules()
            .is_free(request.carpark_id, request.vehicle_id, &window)
            .await?;
        Ok(AvailabilityCheckResponse {
            vehicle_id: request.vehicle_id,
            available,
        })
    }
}
