//! Motor de disponibilidad
//!
//! Responde "qué vehículos, en qué carparks, están libres en `[start, end)`
//! cerca de un punto". Combina el índice geoespacial con una foto
//! consistente de cada carpark candidato.
//!
//! El orden de salida es el del índice (distancia ascendente, id en empate);
//! la disponibilidad nunca reordena.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::geo_index::GeoIndex;
use super::setting_service::SettingService;
use crate::models::{GeoPoint, LocationRef, LocationSummary, TimeWindow, Vehicle, VehicleSummary};
use crate::repositories::{bounded, FleetStore};
use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::{validate_point, validate_radius_km};

/// Parámetros de una búsqueda de disponibilidad
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub point: GeoPoint,
    pub window: TimeWindow,
    /// Radio en km; `None` usa el ajuste vigente
    pub radius_km: Option<f64>,
    pub min_seats: Option<i32>,
    /// Grupos de precio aceptados; vacío acepta cualquiera
    pub price_group_ids: Vec<i64>,
    /// Omitir carparks sin vehículos libres
    pub only_available: bool,
}

impl SearchQuery {
    pub fn new(point: GeoPoint, window: TimeWindow) -> Self {
        Self {
            point,
            window,
            radius_km: None,
            min_seats: None,
            price_group_ids: Vec::new(),
            only_available: false,
        }
    }

    /// Parsear la ventana desde timestamps RFC 3339
    pub fn parse(point: GeoPoint, start: &str, end: &str) -> AppResult<Self> {
        Ok(Self::new(point, TimeWindow::parse(start, end)?))
    }

    pub fn with_radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = Some(radius_km);
        self
    }

    pub fn only_available(mut self) -> Self {
        self.only_available = true;
        self
    }

    fn accepts(&self, vehicle: &Vehicle) -> bool {
        if let Some(min_seats) = self.min_seats {
            if vehicle.seats < min_seats {
                return false;
            }
        }
        if !self.price_group_ids.is_empty() {
            return vehicle
                .price_group_id
                .map_or(false, |id| self.price_group_ids.contains(&id));
        }
        true
    }
}

/// Un carpark del resultado con sus vehículos libres
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAvailability {
    pub location: LocationSummary,
    pub distance_m: f64,
    pub available_vehicle_count: usize,
    pub available_vehicles: Vec<VehicleSummary>,
}

#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn FleetStore>,
    index: GeoIndex,
    settings: SettingService,
    timeout: Duration,
    concurrency: usize,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn FleetStore>,
        index: GeoIndex,
        settings: SettingService,
        timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            index,
            settings,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    /// Buscar vehículos libres cerca de `query.point`.
    ///
    /// Si `cancel` se dispara a mitad de búsqueda no se lanzan más lecturas
    /// y se devuelve [`AppError::Cancelled`]; los resultados parciales se descartan.
    pub async fn search(
        &self,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<LocationAvailability>> {
        validate_point(&query.point)?;
        let radius_km = query.radius_km.unwrap_or_else(|| self.settings.search_radius_km());
        validate_radius_km(radius_km)?;
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let candidates = self.index.near(&query.point, radius_km * 1000.0);
        if candidates.is_empty() {
            debug!(
                "🔍 Sin carparks a {} km de ({}, {})",
                radius_km, query.point.longitude, query.point.latitude
            );
            return Ok(Vec::new());
        }

        let lookups = stream::iter(candidates.into_iter().map(|candidate| {
            let store = Arc::clone(&self.store);
            let timeout = self.timeout;
            async move {
                let key = LocationRef::Id(candidate.location_id);
                let location = bounded(timeout, "location", store.location(&key)).await?;
                Ok::<_, AppError>((candidate, location))
            }
        }))
        .buffered(self.concurrency);
        futures::pin_mut!(lookups);

        let mut results = Vec::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("🛑 Búsqueda cancelada tras {} carparks", results.len());
                    return Err(AppError::Cancelled);
                }
                next = lookups.next() => next,
            };
            let Some(lookup) = next else { break };
            let (candidate, location) = lookup?;

            // borrado entre la consulta al índice y la lectura del store
            let Some(location) = location else {
                debug!("Carpark {} ya no existe, se omite", candidate.location_id);
                continue;
            };

            let available: Vec<VehicleSummary> = location
                .vehicles
                .iter()
                .filter(|v| query.accepts(v) && v.is_free(&query.window))
                .map(Vehicle::summary)
                .collect();

            if query.only_available && available.is_empty() {
                continue;
            }

            results.push(LocationAvailability {
                location: location.summary(),
                distance_m: candidate.distance_m,
                available_vehicle_count: available.len(),
                available_vehicles: available,
            });
        }

        info!(
            "🔍 Búsqueda en {} km: {} carparks ({} → {})",
            radius_km,
            results.len(),
            query.window.start().to_rfc3339(),
            query.window.end().to_rfc3339()
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(seats: i32, price_group_id: Option<i64>) -> Vehicle {
        Vehicle {
            id: 1,
            make_name: "Toyota".to_string(),
            model_name: "Sienta".to_string(),
            plate_number: "SLR1234B".to_string(),
            seats,
            price_group_id,
            price_group_name: None,
            images: vec![],
            schedules: vec![],
        }
    }

    fn query() -> SearchQuery {
        SearchQuery::parse(
            GeoPoint::new(103.8201, 1.4495),
            "2025-01-10T10:00:00Z",
            "2025-01-10T12:00:00Z",
        )
        .unwrap()
    }

    #[test]
    fn test_filters_accept_everything_by_default() {
        assert!(query().accepts(&vehicle(2, None)));
    }

    #[test]
    fn test_seat_and_price_group_filters() {
        let mut q = query();
        q.min_seats = Some(5);
        q.price_group_ids = vec![2, 3];

        assert!(q.accepts(&vehicle(7, Some(3))));
        assert!(!q.accepts(&vehicle(4, Some(3))));
        assert!(!q.accepts(&vehicle(7, Some(1))));
        assert!(!q.accepts(&vehicle(7, None)));
    }

    #[test]
    fn test_parse_rejects_reversed_window() {
        assert!(matches!(
            SearchQuery::parse(
                GeoPoint::new(103.8201, 1.4495),
                "2025-01-10T12:00:00Z",
                "2025-01-10T10:00:00Z"
            ),
            Err(AppError::InvalidWindow(_))
        ));
    }
}
