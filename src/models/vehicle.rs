//! Modelo de Vehicle
//!
//! Un vehículo pertenece a una sola ubicación y es dueño de sus reservas.

use serde::{Deserialize, Serialize};

use super::schedule::{Schedule, TimeWindow};

/// Vehículo con sus reservas, tal como lo devuelve el store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: i64,
    pub make_name: String,
    pub model_name: String,
    pub plate_number: String,
    pub seats: i32,
    pub price_group_id: Option<i64>,
    pub price_group_name: Option<String>,
    pub images: Vec<String>,
    pub schedules: Vec<Schedule>,
}

impl Vehicle {
    pub fn from_new(id: i64, new: NewVehicle) -> Self {
        Self {
            id,
            make_name: new.make_name,
            model_name: new.model_name,
            plate_number: new.plate_number,
            seats: new.seats,
            price_group_id: new.price_group_id,
            price_group_name: new.price_group_name,
            images: new.images,
            schedules: Vec::new(),
        }
    }

    pub fn is_free(&self, window: &TimeWindow) -> bool {
        window.is_free_against(&self.schedules)
    }

    pub fn summary(&self) -> VehicleSummary {
        VehicleSummary {
            id: self.id,
            make_name: self.make_name.clone(),
            model_name: self.model_name.clone(),
            plate_number: self.plate_number.clone(),
            seats: self.seats,
            price_group_id: self.price_group_id,
            price_group_name: self.price_group_name.clone(),
            images: self.images.clone(),
        }
    }
}

/// Datos para registrar un vehículo nuevo (el id lo asigna el registry)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVehicle {
    pub make_name: String,
    pub model_name: String,
    pub plate_number: String,
    pub seats: i32,
    #[serde(default)]
    pub price_group_id: Option<i64>,
    #[serde(default)]
    pub price_group_name: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Vehículo sin reservas, para resultados de búsqueda
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSummary {
    pub id: i64,
    pub make_name: String,
    pub model_name: String,
    pub plate_number: String,
    pub seats: i32,
    pub price_group_id: Option<i64>,
    pub price_group_name: Option<String>,
    pub images: Vec<String>,
}
