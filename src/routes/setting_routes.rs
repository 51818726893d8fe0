use axum::{extract::State, routing::get, Json, Router};

use crate::dto::carpark_dto::{ApiResponse, UpdateSettingsRequest};
use crate::services::SearchSettings;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_setting_router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

async fn get_settings(State(state): State<AppState>) -> Json<SearchSettings> {
    Json(state.settings.current())
}

async fn update_settings(
    State(state): State<AppState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<ApiResponse<SearchSettings>>, AppError> {
    let settings = state.settings.set_search_radius_km(request.search_radius_km)?;
    Ok(Json(ApiResponse::success_with_message(
        settings,
        "Ajustes actualizados".to_string(),
    )))
}
