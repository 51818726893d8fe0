//! Servicio de reservas
//!
//! Operaciones sobre las reservas de un vehículo, direccionado por
//! (id de carpark, id de vehículo). La atomicidad entre la comprobación de
//! solapamiento y la inserción la garantiza el store.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::models::{LocationRef, Schedule, TimeWindow, Vehicle};
use crate::repositories::{bounded, FleetStore, ScheduleWrite};
use crate::utils::errors::{location_not_found, vehicle_not_found, AppError, AppResult};

#[derive(Clone)]
pub struct ScheduleService {
    store: Arc<dyn FleetStore>,
    timeout: Duration,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn FleetStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// `true` si ninguna reserva del vehículo se solapa con `window`
    pub async fn is_free(
        &self,
        location_id: i64,
        vehicle_id: i64,
        window: &TimeWindow,
    ) -> AppResult<bool> {
        let vehicle = self.vehicle(location_id, vehicle_id).await?;
        Ok(vehicle.is_free(window))
    }

    /// Reservas del vehículo ordenadas por inicio
    pub async fn schedules(&self, location_id: i64, vehicle_id: i64) -> AppResult<Vec<Schedule>> {
        let vehicle = self.vehicle(location_id, vehicle_id).await?;
        Ok(vehicle.schedules)
    }

    pub async fn add(
        &self,
        location_id: i64,
        vehicle_id: i64,
        window: TimeWindow,
        booking_id: i64,
    ) -> AppResult<Schedule> {
        let schedule = Schedule::new(booking_id, window);
        let outcome = bounded(
            self.timeout,
            "push_schedule",
            self.store.push_schedule(location_id, vehicle_id, schedule),
        )
        .await?;

        match outcome {
            ScheduleWrite::Applied(schedule) => {
                info!(
                    "📅 Reserva {} añadida al vehículo {} ({} → {})",
                    booking_id,
                    vehicle_id,
                    schedule.start().to_rfc3339(),
                    schedule.end().to_rfc3339()
                );
                Ok(schedule)
            }
            ScheduleWrite::Conflict(existing) => {
                warn!(
                    "⚠️ Reserva {} rechazada: el vehículo {} ya tiene la reserva {}",
                    booking_id, vehicle_id, existing.booking_id
                );
                Err(AppError::ScheduleConflict {
                    vehicle_id,
                    existing_booking_id: existing.booking_id,
                })
            }
            ScheduleWrite::DuplicateBooking => Err(AppError::DuplicateBooking {
                vehicle_id,
                booking_id,
            }),
            other => Err(Self::missing_target(other, location_id, vehicle_id, booking_id)),
        }
    }

    pub async fn remove(
        &self,
        location_id: i64,
        vehicle_id: i64,
        booking_id: i64,
    ) -> AppResult<Schedule> {
        let outcome = bounded(
            self.timeout,
            "pull_schedule",
            self.store.pull_schedule(location_id, vehicle_id, booking_id),
        )
        .await?;

        match outcome {
            ScheduleWrite::Applied(schedule) => {
                info!("🗑️ Reserva {} eliminada del vehículo {}", booking_id, vehicle_id);
                Ok(schedule)
            }
            other => Err(Self::missing_target(other, location_id, vehicle_id, booking_id)),
        }
    }

    /// Carga el vehículo; distingue carpark ausente de vehículo ausente
    async fn vehicle(&self, location_id: i64, vehicle_id: i64) -> AppResult<Vehicle> {
        let found = bounded(self.timeout, "vehicle", self.store.vehicle(location_id, vehicle_id)).await?;
        if let Some(vehicle) = found {
            return Ok(vehicle);
        }

        let key = LocationRef::Id(location_id);
        let location = bounded(self.timeout, "location", self.store.location(&key)).await?;
        let outcome = match location {
            Some(_) => ScheduleWrite::VehicleMissing,
            None => ScheduleWrite::LocationMissing,
        };
        Err(Self::missing_target(outcome, location_id, vehicle_id, 0))
    }

    fn missing_target(
        outcome: ScheduleWrite,
        location_id: i64,
        vehicle_id: i64,
        booking_id: i64,
    ) -> AppError {
        match outcome {
            ScheduleWrite::LocationMissing => location_not_found(LocationRef::Id(location_id)),
            ScheduleWrite::VehicleMissing => vehicle_not_found(LocationRef::Id(location_id), vehicle_id),
            ScheduleWrite::BookingMissing => AppError::ScheduleNotFound {
                vehicle_id,
                booking_id,
            },
            other => AppError::Internal(format!("unexpected schedule write outcome {:?}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, NewLocation, NewVehicle};
    use crate::repositories::MemoryFleetStore;
    use chrono::{TimeZone, Utc};

    fn window(start_h: u32, end_h: u32) -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 1, 10, start_h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 10, end_h, 0, 0).unwrap(),
        )
        .unwrap()
    }

    async fn service_with_vehicle() -> (ScheduleService, i64, i64) {
        let store = Arc::new(MemoryFleetStore::new());
        let location = store
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
        let vehicle = store
            .insert_vehicle(
                &LocationRef::Id(location.id),
                NewVehicle {
                    make_name: "Toyota".to_string(),
                    model_name: "Corolla".to_string(),
                    plate_number: "SLR1234B".to_string(),
                    seats: 5,
                    price_group_id: None,
                    price_group_name: None,
                    images: vec![],
                },
            )
            .await
            .unwrap();
        (
            ScheduleService::new(store, Duration::from_secs(5)),
            location.id,
            vehicle.id,
        )
    }

    #[tokio::test]
    async fn test_add_then_remove_restores_schedules() {
        let (service, location_id, vehicle_id) = service_with_vehicle().await;
        service.add(location_id, vehicle_id, window(9, 11), 1).await.unwrap();
        let before = service.schedules(location_id, vehicle_id).await.unwrap();

        service.add(location_id, vehicle_id, window(13, 14), 2).await.unwrap();
        service.remove(location_id, vehicle_id, 2).await.unwrap();

        assert_eq!(service.schedules(location_id, vehicle_id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_conflict_and_missing_errors() {
        let (service, location_id, vehicle_id) = service_with_vehicle().await;
        service.add(location_id, vehicle_id, window(9, 11), 1).await.unwrap();

        assert!(matches!(
            service.add(location_id, vehicle_id, window(10, 12), 2).await,
            Err(AppError::ScheduleConflict { existing_booking_id: 1, .. })
        ));
        assert!(matches!(
            service.remove(location_id, vehicle_id, 99).await,
            Err(AppError::ScheduleNotFound { booking_id: 99, .. })
        ));
        assert!(matches!(
            service.add(location_id + 100, vehicle_id, window(12, 13), 3).await,
            Err(AppError::LocationNotFound(_))
        ));
        assert!(matches!(
            service.add(location_id, vehicle_id + 100, window(12, 13), 3).await,
            Err(AppError::VehicleNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_is_free_respects_touching_windows() {
        let (service, location_id, vehicle_id) = service_with_vehicle().await;
        service.add(location_id, vehicle_id, window(9, 11), 1).await.unwrap();

        assert!(!service.is_free(location_id, vehicle_id, &window(10, 12)).await.unwrap());
        assert!(service.is_free(location_id, vehicle_id, &window(11, 12)).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_free_distinguishes_missing_location_from_missing_vehicle() {
        let (service, location_id, vehicle_id) = service_with_vehicle().await;

        assert!(matches!(
            service.is_free(location_id + 100, vehicle_id, &window(9, 10)).await,
            Err(AppError::LocationNotFound(_))
        ));
        assert!(matches!(
            service.is_free(location_id, vehicle_id + 100, &window(9, 10)).await,
            Err(AppError::VehicleNotFound(_))
        ));
        assert!(matches!(
            service.schedules(location_id + 100, vehicle_id).await,
            Err(AppError::LocationNotFound(_))
        ));
    }
}
