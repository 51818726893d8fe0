//! Modelo de Location (carpark)
//!
//! Este módulo contiene la ubicación física, sus lots y la referencia
//! por id o por nombre que usan las operaciones de flota.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::vehicle::Vehicle;

/// Punto geográfico en grados decimales (longitud, latitud)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

/// Plaza física numerada dentro del carpark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub level: String,
    pub lot_number: String,
}

/// Carpark con su flota completa
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub postal_code: String,
    pub address: String,
    pub point: GeoPoint,
    pub lots: Vec<Lot>,
    pub has_slashed_vehicle: bool,
    pub vehicles: Vec<Vehicle>,
}

impl Location {
    pub fn from_new(id: i64, new: NewLocation) -> Self {
        Self {
            id,
            name: new.name,
            postal_code: new.postal_code,
            address: new.address,
            point: new.point,
            lots: new.lots,
            has_slashed_vehicle: new.has_slashed_vehicle,
            vehicles: Vec::new(),
        }
    }

    pub fn summary(&self) -> LocationSummary {
        LocationSummary {
            id: self.id,
            name: self.name.clone(),
            postal_code: self.postal_code.clone(),
            address: self.address.clone(),
            point: self.point,
            lots: self.lots.clone(),
            has_slashed_vehicle: self.has_slashed_vehicle,
        }
    }
}

/// Datos para crear un carpark (el id lo asigna el registry)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub name: String,
    pub postal_code: String,
    pub address: String,
    pub point: GeoPoint,
    #[serde(default)]
    pub lots: Vec<Lot>,
    #[serde(default)]
    pub has_slashed_vehicle: bool,
}

/// Carpark sin vehículos, para listados y búsquedas
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    pub id: i64,
    pub name: String,
    pub postal_code: String,
    pub address: String,
    pub point: GeoPoint,
    pub lots: Vec<Lot>,
    pub has_slashed_vehicle: bool,
}

/// Forma de direccionar un carpark: por id numérico o por nombre único
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocationRef {
    Id(i64),
    Name(String),
}

impl From<i64> for LocationRef {
    fn from(id: i64) -> Self {
        LocationRef::Id(id)
    }
}

impl From<&str> for LocationRef {
    fn from(name: &str) -> Self {
        LocationRef::Name(name.to_string())
    }
}

impl From<String> for LocationRef {
    fn from(name: String) -> Self {
        LocationRef::Name(name)
    }
}

impl fmt::Display for LocationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationRef::Id(id) => write!(f, "#{}", id),
            LocationRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}
