//! Configuración de variables de entorno
//!
//! Este módulo carga y valida una sola vez, al arrancar, la configuración
//! tipada del servicio. Cada ajuste tiene un valor por defecto explícito.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 20.0;
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SEARCH_CONCURRENCY: usize = 8;

/// Errores de carga de configuración
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub search_radius_km: f64,
    pub store_timeout: Duration,
    pub search_concurrency: usize,
    pub cors_origins: Vec<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8081,
            database_url: None,
            search_radius_km: DEFAULT_SEARCH_RADIUS_KM,
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
            search_concurrency: DEFAULT_SEARCH_CONCURRENCY,
            cors_origins: Vec::new(),
        }
    }
}

impl EnvironmentConfig {
    /// Cargar desde las variables de entorno del proceso
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Cargar usando una función de búsqueda arbitraria (útil en tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let search_radius_km: f64 = parse_or(&lookup, "SEARCH_RADIUS_KM", defaults.search_radius_km)?;
        if !search_radius_km.is_finite() || search_radius_km <= 0.0 {
            return Err(invalid("SEARCH_RADIUS_KM", search_radius_km, "must be > 0"));
        }

        let timeout_secs: u64 = parse_or(&lookup, "STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(invalid("STORE_TIMEOUT_SECS", timeout_secs, "must be > 0"));
        }

        let search_concurrency: usize = parse_or(&lookup, "SEARCH_CONCURRENCY", defaults.search_concurrency)?;
        if search_concurrency == 0 {
            return Err(invalid("SEARCH_CONCURRENCY", search_concurrency, "must be > 0"));
        }

        Ok(Self {
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            database_url: lookup("DATABASE_URL"),
            search_radius_km,
            store_timeout: Duration::from_secs(timeout_secs),
            search_concurrency,
            cors_origins: lookup("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn invalid(key: &'static str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
