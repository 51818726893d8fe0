//! Repositorios
//!
//! Contrato de persistencia del motor de flota y sus implementaciones:
//! un store en memoria y un store PostgreSQL.

pub mod memory_store;
pub mod pg_store;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::error;

use crate::models::{
    GeoPoint, Location, LocationRef, LocationSummary, NewLocation, NewVehicle, Schedule, Vehicle,
};
use crate::utils::errors::{AppError, AppResult};

pub use memory_store::MemoryFleetStore;
pub use pg_store::PgFleetStore;

/// Resultado de una escritura condicional sobre las reservas de un vehículo.
///
/// "Nada coincidió" se reporta como variante, nunca como error del store.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleWrite {
    Applied(Schedule),
    LocationMissing,
    VehicleMissing,
    /// Reserva existente que se solapa con la nueva
    Conflict(Schedule),
    DuplicateBooking,
    BookingMissing,
}

/// Capacidades que el motor necesita del almacenamiento.
///
/// Las asignaciones de id y las escrituras de reservas son atómicas dentro
/// de cada implementación; el motor nunca hace "leer máximo y luego escribir".
#[async_trait]
pub trait FleetStore: Send + Sync {
    /// Inserta un carpark asignando `max(id) + 1`; falla con `DuplicateName`
    async fn insert_location(&self, new: NewLocation) -> AppResult<Location>;

    /// Elimina un carpark con toda su flota
    async fn remove_location(&self, id: i64) -> AppResult<Option<Location>>;

    /// Foto consistente de un carpark con vehículos y reservas
    async fn location(&self, key: &LocationRef) -> AppResult<Option<Location>>;

    async fn location_by_postal_code(&self, postal_code: &str) -> AppResult<Option<Location>>;

    /// Todos los carparks, ordenados por id
    async fn list_locations(&self) -> AppResult<Vec<LocationSummary>>;

    /// Devuelve `false` si ningún carpark tiene ese nombre
    async fn update_postal_code(&self, name: &str, postal_code: &str) -> AppResult<bool>;

    /// Proyección (id, punto) para reconstruir el índice geoespacial
    async fn location_points(&self) -> AppResult<Vec<(i64, GeoPoint)>>;

    /// Añade un vehículo asignando el siguiente id global de vehículo
    async fn insert_vehicle(&self, location: &LocationRef, new: NewVehicle) -> AppResult<Vehicle>;

    /// Elimina el vehículo con esa matrícula, junto con sus reservas
    async fn remove_vehicle(&self, location: &LocationRef, plate_number: &str) -> AppResult<Vehicle>;

    async fn vehicle(&self, location_id: i64, vehicle_id: i64) -> AppResult<Option<Vehicle>>;

    /// Inserta la reserva solo si no se solapa con ninguna existente
    async fn push_schedule(
        &self,
        location_id: i64,
        vehicle_id: i64,
        schedule: Schedule,
    ) -> AppResult<ScheduleWrite>;

    /// Elimina la reserva identificada por `booking_id`
    async fn pull_schedule(
        &self,
        location_id: i64,
        vehicle_id: i64,
        booking_id: i64,
    ) -> AppResult<ScheduleWrite>;
}

/// Ejecutar una operación del store con un límite de tiempo
pub async fn bounded<T, F>(limit: Duration, operation: &'static str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            error!("⏰ Operación '{}' del store excedió {:?}", operation, limit);
            Err(AppError::Timeout {
                operation,
                after: limit,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let value = bounded(Duration::from_millis(100), "noop", async { Ok::<_, AppError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: AppResult<()> = bounded(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(AppError::Timeout { operation: "slow", .. })));
    }
}
