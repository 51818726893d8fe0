use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use carpark_fleet::config::EnvironmentConfig;
use carpark_fleet::routes::create_router;
use carpark_fleet::AppState;

fn create_test_app() -> Router {
    create_router(AppState::in_memory(EnvironmentConfig::default()))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Crea SB17 con un vehículo reservado de 09:00 a 11:00 UTC
async fn seed(app: &Router) -> (i64, i64) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/carparks",
        Some(json!({
            "name": "SB17",
            "postalCode": "730017",
            "address": "17 Sembawang Road",
            "longitude": 103.8237,
            "latitude": 1.4509,
            "lots": [{ "level": "B1", "lotNumber": "17" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let carpark_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        app,
        Method::POST,
        "/api/carparks/vehicles",
        Some(json!({
            "carparkName": "SB17",
            "makeName": "Toyota",
            "modelName": "Corolla Altis",
            "plateNumber": "SLR1313V",
            "seats": 5,
            "priceGroupId": 2
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let vehicle_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        app,
        Method::POST,
        "/api/carparks/schedules",
        Some(json!({
            "carparkId": carpark_id,
            "vehicleId": vehicle_id,
            "bookingId": 1001,
            "start": "2025-01-10T09:00:00Z",
            "end": "2025-01-10T11:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    (carpark_id, vehicle_id)
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_search_reports_busy_vehicle_and_distance() {
    let app = create_test_app();
    seed(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/carparks/search",
        Some(json!({
            "longitude": 103.8201,
            "latitude": 1.4495,
            "start": "2025-01-10T10:00:00Z",
            "end": "2025-01-10T12:00:00Z"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["location"]["name"], "SB17");
    assert_eq!(results[0]["availableVehicleCount"], 0);
    let distance = results[0]["distanceM"].as_f64().unwrap();
    assert!((400.0..470.0).contains(&distance));
}

#[tokio::test]
async fn test_overlapping_booking_is_conflict() {
    let app = create_test_app();
    let (carpark_id, vehicle_id) = seed(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/carparks/schedules",
        Some(json!({
            "carparkId": carpark_id,
            "vehicleId": vehicle_id,
            "bookingId": 1002,
            "start": "2025-01-10T10:30:00Z",
            "end": "2025-01-10T11:30:00Z"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "SCHEDULE_CONFLICT");
    assert_eq!(body["details"]["existing_booking_id"], 1001);
}

#[tokio::test]
async fn test_check_and_remove_schedule() {
    let app = create_test_app();
    let (carpark_id, vehicle_id) = seed(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/carparks/schedules/check",
        Some(json!({
            "carparkId": carpark_id,
            "vehicleId": vehicle_id,
            "start": "2025-01-10T11:00:00Z",
            "end": "2025-01-10T12:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);

    let remove = json!({ "carparkId": carpark_id, "vehicleId": vehicle_id, "bookingId": 1001 });
    let (status, _) = send(&app, Method::DELETE, "/api/carparks/schedules", Some(remove.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::DELETE, "/api/carparks/schedules", Some(remove)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SCHEDULE_NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_window_is_bad_request() {
    let app = create_test_app();
    seed(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/carparks/search",
        Some(json!({
            "longitude": 103.8201,
            "latitude": 1.4495,
            "start": "2025-01-10T12:00:00Z",
            "end": "2025-01-10T10:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_WINDOW");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/carparks/search",
        Some(json!({
            "longitude": 103.8201,
            "latitude": 1.4495,
            "start": "tomorrow",
            "end": "2025-01-10T10:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_WINDOW");
}

#[tokio::test]
async fn test_remove_unknown_plate_is_not_found() {
    let app = create_test_app();
    seed(&app).await;

    let (status, body) = send(
        &app,
        Method::DELETE,
        "/api/carparks/vehicles",
        Some(json!({ "carparkName": "SB17", "plateNumber": "SLR9553A" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "VEHICLE_NOT_FOUND");

    let (_, body) = send(&app, Method::GET, "/api/carparks/1", None).await;
    assert_eq!(body["vehicles"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_carpark_name_is_conflict() {
    let app = create_test_app();
    seed(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/carparks",
        Some(json!({
            "name": "SB17",
            "postalCode": "730017",
            "address": "Elsewhere",
            "longitude": 103.9,
            "latitude": 1.35
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_NAME");
}

#[tokio::test]
async fn test_lookup_and_postal_code_update() {
    let app = create_test_app();
    let (carpark_id, _) = seed(&app).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/carparks/postal-code",
        Some(json!({ "name": "SB17", "postalCode": "750017" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = send(&app, Method::GET, "/api/carparks?postalCode=750017", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], carpark_id);

    let (status, body) = send(&app, Method::GET, "/api/carparks?name=SB99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "LOCATION_NOT_FOUND");

    let (_, body) = send(&app, Method::GET, "/api/carparks", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_carpark_removes_it_from_search() {
    let app = create_test_app();
    let (carpark_id, _) = seed(&app).await;

    let (status, _) = send(&app, Method::DELETE, &format!("/api/carparks/{}", carpark_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/carparks/search",
        Some(json!({
            "longitude": 103.8201,
            "latitude": 1.4495,
            "start": "2025-01-10T10:00:00Z",
            "end": "2025-01-10T12:00:00Z"
        })),
    )
    .await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = send(&app, Method::GET, &format!("/api/carparks/{}", carpark_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_round_trip() {
    let app = create_test_app();

    let (status, body) = send(&app, Method::GET, "/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["searchRadiusKm"], 20.0);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/settings",
        Some(json!({ "searchRadiusKm": 5.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["searchRadiusKm"], 5.0);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/settings",
        Some(json!({ "searchRadiusKm": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}
