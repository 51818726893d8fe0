//! Servicio de configuración en caliente
//!
//! Ajustes tipados que se pueden cambiar sin reiniciar el proceso. Cada
//! ajuste tiene un valor por defecto que viene de [`EnvironmentConfig`].

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EnvironmentConfig;
use crate::utils::errors::AppResult;
use crate::utils::validation::validate_radius_km;

/// Ajustes de búsqueda vigentes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSettings {
    pub search_radius_km: f64,
}

#[derive(Clone)]
pub struct SettingService {
    defaults: SearchSettings,
    current: Arc<RwLock<SearchSettings>>,
}

impl SettingService {
    pub fn new(defaults: SearchSettings) -> Self {
        Self {
            defaults,
            current: Arc::new(RwLock::new(defaults)),
        }
    }

    pub fn from_config(config: &EnvironmentConfig) -> Self {
        Self::new(SearchSettings {
            search_radius_km: config.search_radius_km,
        })
    }

    pub fn current(&self) -> SearchSettings {
        *self.current.read()
    }

    pub fn search_radius_km(&self) -> f64 {
        self.current.read().search_radius_km
    }

    pub fn set_search_radius_km(&self, radius_km: f64) -> AppResult<SearchSettings> {
        validate_radius_km(radius_km)?;
        let mut current = self.current.write();
        current.search_radius_km = radius_km;
        info!("⚙️ Radio de búsqueda actualizado a {} km", radius_km);
        Ok(*current)
    }

    /// Volver a los valores de arranque
    pub fn reset(&self) -> SearchSettings {
        *self.current.write() = self.defaults;
        self.defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::AppError;

    #[test]
    fn test_radius_override_and_reset() {
        let settings = SettingService::from_config(&EnvironmentConfig::default());
        assert_eq!(settings.search_radius_km(), 20.0);

        settings.set_search_radius_km(3.5).unwrap();
        assert_eq!(settings.search_radius_km(), 3.5);

        // los clones comparten el mismo estado
        let other = settings.clone();
        assert_eq!(other.search_radius_km(), 3.5);

        assert_eq!(settings.reset().search_radius_km, 20.0);
        assert_eq!(other.search_radius_km(), 20.0);
    }

    #[test]
    fn test_invalid_radius_is_rejected() {
        let settings = SettingService::new(SearchSettings { search_radius_km: 10.0 });
        assert!(matches!(
            settings.set_search_radius_km(-1.0),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(settings.search_radius_km(), 10.0);
    }
}
