//! Índice geoespacial
//!
//! Proyección derivada (id de carpark → punto) que se reconstruye desde el
//! store al arrancar. Nunca es dueña del estado de los carparks.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

use crate::models::GeoPoint;
use crate::utils::geo::{bounding_box, haversine_m, in_bounding_box};

/// Carpark candidato con su distancia al punto de búsqueda
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyLocation {
    pub location_id: i64,
    pub distance_m: f64,
}

#[derive(Clone, Default)]
pub struct GeoIndex {
    points: Arc<RwLock<BTreeMap<i64, GeoPoint>>>,
}

impl GeoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, location_id: i64, point: GeoPoint) {
        self.points.write().insert(location_id, point);
    }

    pub fn remove(&self, location_id: i64) -> bool {
        self.points.write().remove(&location_id).is_some()
    }

    /// Reemplazar todo el contenido del índice
    pub fn rebuild<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (i64, GeoPoint)>,
    {
        let fresh: BTreeMap<i64, GeoPoint> = entries.into_iter().collect();
        let count = fresh.len();
        *self.points.write() = fresh;
        info!("🗺️ Índice geoespacial reconstruido con {} carparks", count);
        count
    }

    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    /// Carparks dentro de `radius_m` ordenados por distancia ascendente;
    /// los empates se resuelven por id ascendente.
    pub fn near(&self, point: &GeoPoint, radius_m: f64) -> Vec<NearbyLocation> {
        let bbox = bounding_box(point, radius_m);

        let mut found: Vec<NearbyLocation> = self
            .points
            .read()
            .iter()
            .filter(|(_, candidate)| in_bounding_box(candidate, bbox))
            .filter_map(|(&location_id, candidate)| {
                let distance_m = haversine_m(point, candidate);
                (distance_m <= radius_m).then_some(NearbyLocation {
                    location_id,
                    distance_m,
                })
            })
            .collect();

        found.sort_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then(a.location_id.cmp(&b.location_id))
        });
        found
    }
}
