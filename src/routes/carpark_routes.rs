use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use tokio_util::sync::CancellationToken;

use crate::controllers::carpark_controller::CarparkController;
use crate::dto::carpark_dto::{
    AddScheduleRequest, AddVehicleRequest, ApiResponse, AvailabilityCheckResponse,
    CarparkLookupQuery, CheckScheduleRequest, CreateCarparkRequest, CreatedResponse,
    RemoveScheduleRequest, RemoveVehicleRequest, SearchCarparksRequest, UpdatePostalCodeRequest,
};
use crate::models::{Location, LocationSummary, Schedule, Vehicle};
use crate::services::LocationAvailability;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_carpark_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_carpark))
        .route("/", get(lookup_carparks))
        .route("/search", post(search_carparks))
        .route("/postal-code", put(update_postal_code))
        .route("/vehicles", post(add_vehicle))
        .route("/vehicles", delete(remove_vehicle))
        .route("/schedules", post(add_schedule))
        .route("/schedules", delete(remove_schedule))
        .route("/schedules/check", post(check_schedule))
        .route("/:id", get(get_carpark))
        .route("/:id", delete(delete_carpark))
}

async fn search_carparks(
    State(state): State<AppState>,
    Json(request): Json<SearchCarparksRequest>,
) -> Result<Json<ApiResponse<Vec<LocationAvailability>>>, AppError> {
    // si el cliente se desconecta, el guard cancela la búsqueda
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let controller = CarparkController::new(state);
    let response = controller.search(request, &cancel).await?;
    Ok(Json(response))
}

async fn create_carpark(
    State(state): State<AppState>,
    Json(request): Json<CreateCarparkRequest>,
) -> Result<Json<ApiResponse<CreatedResponse>>, AppError> {
    let controller = CarparkController::new(state);
    let response = controller.create(request).await?;
    Ok(Json(response))
}

async fn get_carpark(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Location>, AppError> {
    let controller = CarparkController::new(state);
    let response = controller.get_by_id(id).await?;
    Ok(Json(response))
}

async fn lookup_carparks(
    State(state): State<AppState>,
    Query(query): Query<CarparkLookupQuery>,
) -> Result<Json<Vec<LocationSummary>>, AppError> {
    let controller = CarparkController::new(state);
    let response = controller.lookup(query).await?;
    Ok(Json(response))
}

async fn delete_carpark(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<LocationSummary>>, AppError> {
    let controller = CarparkController::new(state);
    let response = controller.remove(id).await?;
    Ok(Json(response))
}

async fn update_postal_code(
    State(state): State<AppState>,
    Json(request): Json<UpdatePostalCodeRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = CarparkController::new(state);
    let response = controller.update_postal_code(request).await?;
    Ok(Json(response))
}

async fn add_vehicle(
    State(state): State<AppState>,
    Json(request): Json<AddVehicleRequest>,
) -> Result<Json<ApiResponse<CreatedResponse>>, AppError> {
    let controller = CarparkController::new(state);
    let response = controller.add_vehicle(request).await?;
    Ok(Json(response))
}

async fn remove_vehicle(
    State(state): State<AppState>,
    Json(request): Json<RemoveVehicleRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = CarparkController::new(state);
    let response = controller.remove_vehicle(request).await?;
    Ok(Json(response))
}

async fn add_schedule(
    State(state): State<AppState>,
    Json(request): Json<AddScheduleRequest>,
) -> Result<Json<ApiResponse<Schedule>>, AppError> {
    let controller = CarparkController::new(state);
    let response = controller.add_schedule(request).await?;
    Ok(Json(response))
}

async fn remove_schedule(
    State(state): State<AppState>,
    Json(request): Json<RemoveScheduleRequest>,
) -> Result<Json<ApiResponse<Schedule>>, AppError> {
    let controller = CarparkController::new(state);
    let response = controller.remove_schedule(request).await?;
    Ok(Json(response))
}

async fn check_schedule(
    State(state): State<AppState>,
    Json(request): Json<CheckScheduleRequest>,
) -> Result<Json<AvailabilityCheckResponse>, AppError> {
    let controller = CarparkController::new(state);
    let response = controller.check_schedule(request).await?;
    Ok(Json(response))
}
