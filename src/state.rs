//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. Es dueño explícito del store, del índice
//! geoespacial y de los ajustes; su ciclo de vida es el del servidor.

use std::sync::Arc;

use tracing::info;

use crate::config::EnvironmentConfig;
use crate::repositories::{FleetStore, MemoryFleetStore};
use crate::services::{
    AvailabilityService, FleetService, GeoIndex, LocationService, ScheduleService, SettingService,
};
use crate::utils::errors::AppResult;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub store: Arc<dyn FleetStore>,
    pub geo_index: GeoIndex,
    pub settings: SettingService,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, store: Arc<dyn FleetStore>) -> Self {
        let settings = SettingService::from_config(&config);
        Self {
            config,
            store,
            geo_index: GeoIndex::new(),
            settings,
        }
    }

    /// Estado sobre un store en memoria vacío
    pub fn in_memory(config: EnvironmentConfig) -> Self {
        Self::new(config, Arc::new(MemoryFleetStore::new()))
    }

    /// Cargar el índice geoespacial desde el store
    pub async fn bootstrap(&self) -> AppResult<usize> {
        let count = self.locations().rebuild_index().await?;
        info!("✅ Estado inicializado con {} carparks", count);
        Ok(count)
    }

    pub fn locations(&self) -> LocationService {
        LocationService::new(
            Arc::clone(&self.store),
            self.geo_index.clone(),
            self.config.store_timeout,
        )
    }

    pub fn fleet(&self) -> FleetService {
        FleetService::new(Arc::clone(&self.store), self.config.store_timeout)
    }

    pub fn schedules(&self) -> ScheduleService {
        ScheduleService::new(Arc::clone(&self.store), self.config.store_timeout)
    }

    pub fn availability(&self) -> AvailabilityService {
        AvailabilityService::new(
            Arc::clone(&self.store),
            self.geo_index.clone(),
            self.settings.clone(),
            self.config.store_timeout,
            self.config.search_concurrency,
        )
    }
}
