//! Servicio de flota
//!
//! Roster de vehículos por carpark. Los ids de vehículo son globales a
//! todos los carparks y los asigna el store de forma atómica.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::models::{LocationRef, NewVehicle, TimeWindow, Vehicle};
use crate::repositories::{bounded, FleetStore};
use crate::utils::errors::{bad_request_error, location_not_found, AppResult};

#[derive(Clone)]
pub struct FleetService {
    store: Arc<dyn FleetStore>,
    timeout: Duration,
}

impl FleetService {
    pub fn new(store: Arc<dyn FleetStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Registrar un vehículo en el carpark y devolver su id
    pub async fn add_vehicle(
        &self,
        location: impl Into<LocationRef>,
        new: NewVehicle,
    ) -> AppResult<i64> {
        let location = location.into();
        if new.plate_number.trim().is_empty() {
            return Err(bad_request_error("plate number is required"));
        }
        if new.seats < 0 {
            return Err(bad_request_error("seats cannot be negative"));
        }

        let vehicle = bounded(self.timeout, "insert_vehicle", self.store.insert_vehicle(&location, new)).await?;
        info!(
            "🚗 Vehículo {} ({}) añadido al carpark {}",
            vehicle.id, vehicle.plate_number, location
        );
        Ok(vehicle.id)
    }

    /// Eliminar el vehículo con esa matrícula junto con sus reservas
    pub async fn remove_vehicle(
        &self,
        location: impl Into<LocationRef>,
        plate_number: &str,
    ) -> AppResult<Vehicle> {
        let location = location.into();
        let result = bounded(
            self.timeout,
            "remove_vehicle",
            self.store.remove_vehicle(&location, plate_number),
        )
        .await;

        match &result {
            Ok(vehicle) => info!(
                "🗑️ Vehículo {} ({}) eliminado del carpark {} con {} reservas",
                vehicle.id,
                plate_number,
                location,
                vehicle.schedules.len()
            ),
            Err(e) => warn!("⚠️ No se pudo eliminar {} de {}: {}", plate_number, location, e),
        }
        result
    }

    /// Número de vehículos del carpark libres durante `window`
    pub async fn count_available(&self, location_id: i64, window: &TimeWindow) -> AppResult<usize> {
        let vehicles = self.vehicles(location_id).await?;
        Ok(vehicles.iter().filter(|v| v.is_free(window)).count())
    }

    pub async fn vehicles(&self, location: impl Into<LocationRef>) -> AppResult<Vec<Vehicle>> {
        let location = location.into();
        let found = bounded(self.timeout, "location", self.store.location(&location))
            .await?
            .ok_or_else(|| location_not_found(&location))?;
        Ok(found.vehicles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, NewLocation, Schedule};
    use crate::repositories::MemoryFleetStore;
    use crate::utils::errors::AppError;
    use chrono::{TimeZone, Utc};

    fn car(plate: &str) -> NewVehicle {
        NewVehicle {
            make_name: "Honda".to_string(),
            model_name: "Jazz".to_string(),
            plate_number: plate.to_string(),
            seats: 5,
            price_group_id: Some(1),
            price_group_name: Some("Economy".to_string()),
            images: vec![],
        }
    }

    fn window(start_h: u32, end_h: u32) -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 1, 10, start_h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 10, end_h, 0, 0).unwrap(),
        )
        .unwrap()
    }

    async fn fleet() -> (FleetService, Arc<MemoryFleetStore>) {
        let store = Arc::new(MemoryFleetStore::new());
        store
            .insert_location(NewLocation {
                name: "SB17".to_string(),
                postal_code: "730017".to_string(),
                address: "17 Sembawang Road".to_string(),
                point: GeoPoint::new(103.8237, 1.4509),
                lots: vec![],
                has_slashed_vehicle: false,
            })
            .await
            .unwrap();
        (FleetService::new(store.clone(), Duration::from_secs(5)), store)
    }

    #[tokio::test]
    async fn test_add_vehicle_by_name_and_count_available() {
        let (fleet, store) = fleet().await;
        let first = fleet.add_vehicle("SB17", car("SLR1111A")).await.unwrap();
        let second = fleet.add_vehicle(1_i64, car("SLR2222B")).await.unwrap();
        assert_eq!(second, first + 1);

        store
            .push_schedule(1, first, Schedule::new(7, window(9, 11)))
            .await
            .unwrap();

        assert_eq!(fleet.count_available(1, &window(10, 12)).await.unwrap(), 1);
        assert_eq!(fleet.count_available(1, &window(11, 12)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unknown_location_and_blank_plate() {
        let (fleet, _) = fleet().await;
        assert!(matches!(
            fleet.add_vehicle("SB99", car("SLR1111A")).await,
            Err(AppError::LocationNotFound(_))
        ));
        assert!(matches!(
            fleet.add_vehicle("SB17", car("  ")).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_missing_plate_leaves_roster_unchanged() {
        let (fleet, _) = fleet().await;
        fleet.add_vehicle("SB17", car("SLR1111A")).await.unwrap();
        let before = fleet.vehicles("SB17").await.unwrap();

        assert!(matches!(
            fleet.remove_vehicle("SB17", "SLR9553A").await,
            Err(AppError::VehicleNotFound(_))
        ));
        assert_eq!(fleet.vehicles("SB17").await.unwrap(), before);
    }
}
