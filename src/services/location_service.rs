//! Servicio de carparks
//!
//! Alta, baja y búsqueda de carparks. Mantiene el índice geoespacial
//! sincronizado con el store en la misma operación lógica.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::geo_index::GeoIndex;
use crate::models::{Location, LocationRef, LocationSummary, NewLocation};
use crate::repositories::{bounded, FleetStore};
use crate::utils::errors::{bad_request_error, location_not_found, AppError, AppResult};
use crate::utils::validation::validate_point;

#[derive(Clone)]
pub struct LocationService {
    store: Arc<dyn FleetStore>,
    index: GeoIndex,
    timeout: Duration,
}

impl LocationService {
    pub fn new(store: Arc<dyn FleetStore>, index: GeoIndex, timeout: Duration) -> Self {
        Self {
            store,
            index,
            timeout,
        }
    }

    /// Crear un carpark y devolver el id asignado
    pub async fn create_location(&self, new: NewLocation) -> AppResult<i64> {
        if new.name.trim().is_empty() {
            return Err(bad_request_error("location name is required"));
        }
        validate_point(&new.point)?;

        let name = new.name.clone();
        // La tarea sigue viva aunque el llamador expire o se cancele
        let task = tokio::spawn(Self::insert_and_index(
            Arc::clone(&self.store),
            self.index.clone(),
            new,
        ));
        let location = bounded(self.timeout, "insert_location", join_store_task(task))
            .await
            .map_err(|e| {
                warn!("⚠️ No se pudo crear el carpark '{}': {}", name, e);
                e
            })?;

        info!("🅿️ Carpark {} '{}' creado", location.id, location.name);
        Ok(location.id)
    }

    pub async fn get_location(&self, id: i64) -> AppResult<Location> {
        self.lookup(LocationRef::Id(id)).await
    }

    pub async fn find_by_name(&self, name: &str) -> AppResult<Location> {
        self.lookup(LocationRef::from(name)).await
    }

    pub async fn find_by_postal_code(&self, postal_code: &str) -> AppResult<Location> {
        bounded(
            self.timeout,
            "location_by_postal_code",
            self.store.location_by_postal_code(postal_code),
        )
        .await?
        .ok_or_else(|| location_not_found(format!("with postal code {}", postal_code)))
    }

    /// Carparks sin flota, ordenados por id
    pub async fn list_locations(&self) -> AppResult<Vec<LocationSummary>> {
        bounded(self.timeout, "list_locations", self.store.list_locations()).await
    }

    pub async fn update_postal_code(&self, name: &str, postal_code: &str) -> AppResult<()> {
        if postal_code.trim().is_empty() {
            return Err(bad_request_error("postal code is required"));
        }

        let updated = bounded(
            self.timeout,
            "update_postal_code",
            self.store.update_postal_code(name, postal_code),
        )
        .await?;
        if !updated {
            return Err(location_not_found(LocationRef::from(name)));
        }

        info!("📮 Código postal de '{}' actualizado a {}", name, postal_code);
        Ok(())
    }

    /// Eliminar un carpark con toda su flota
    pub async fn remove_location(&self, id: i64) -> AppResult<Location> {
        let task = tokio::spawn(Self::remove_and_unindex(
            Arc::clone(&self.store),
            self.index.clone(),
            id,
        ));
        let removed = bounded(self.timeout, "remove_location", join_store_task(task)).await?;
        let location = removed.ok_or_else(|| location_not_found(LocationRef::Id(id)))?;

        info!(
            "🗑️ Carpark {} '{}' eliminado con {} vehículos",
            id,
            location.name,
            location.vehicles.len()
        );
        Ok(location)
    }

    /// Reconstruir el índice geoespacial desde el store
    pub async fn rebuild_index(&self) -> AppResult<usize> {
        let points = bounded(self.timeout, "location_points", self.store.location_points()).await?;
        Ok(self.index.rebuild(points))
    }

    async fn lookup(&self, key: LocationRef) -> AppResult<Location> {
        bounded(self.timeout, "location", self.store.location(&key))
            .await?
            .ok_or_else(|| location_not_found(&key))
    }

    async fn insert_and_index(
        store: Arc<dyn FleetStore>,
        index: GeoIndex,
        new: NewLocation,
    ) -> AppResult<Location> {
        let key = LocationRef::Name(new.name.clone());
        match store.insert_location(new).await {
            Ok(location) => {
                index.insert(location.id, location.point);
                Ok(location)
            }
            Err(e @ AppError::StoreUnavailable(_)) => {
                Self::reconcile(store.as_ref(), &index, &key).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn remove_and_unindex(
        store: Arc<dyn FleetStore>,
        index: GeoIndex,
        id: i64,
    ) -> AppResult<Option<Location>> {
        match store.remove_location(id).await {
            Ok(removed) => {
                index.remove(id);
                Ok(removed)
            }
            Err(e @ AppError::StoreUnavailable(_)) => {
                Self::reconcile(store.as_ref(), &index, &LocationRef::Id(id)).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Alinear el índice con lo que el store tiene tras una respuesta perdida
    async fn reconcile(store: &dyn FleetStore, index: &GeoIndex, key: &LocationRef) {
        match store.location(key).await {
            Ok(Some(location)) => {
                index.insert(location.id, location.point);
                info!("🔄 Carpark {} reindexado tras error del store", location.id);
            }
            Ok(None) => {
                if let LocationRef::Id(id) = key {
                    index.remove(*id);
                }
            }
            Err(e) => warn!("⚠️ No se pudo reconciliar el índice para {}: {}", key, e),
        }
    }
}

async fn join_store_task<T>(task: JoinHandle<AppResult<T>>) -> AppResult<T> {
    task.await
        .map_err(|e| AppError::Internal(format!("store task failed: {}", e)))?
}
