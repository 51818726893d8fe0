//! Store en memoria
//!
//! Implementación de [`FleetStore`] dentro del proceso. La unidad de
//! exclusión para escrituras de reservas es el vehículo: cada vehículo
//! guarda sus reservas tras su propio `Mutex`, así que reservas sobre
//! vehículos distintos avanzan en paralelo.
//!
//! Orden de locks: mapa de carparks → roster del carpark → reservas del vehículo.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::{FleetStore, ScheduleWrite};
use crate::models::{
    GeoPoint, Location, LocationRef, LocationSummary, Lot, NewLocation, NewVehicle, Schedule,
    Vehicle, VehicleSummary,
};
use crate::utils::errors::{location_not_found, vehicle_not_found, AppError, AppResult};

struct VehicleSlot {
    info: VehicleSummary,
    schedules: Mutex<Vec<Schedule>>,
}

impl VehicleSlot {
    fn snapshot(&self) -> Vehicle {
        let schedules = self.schedules.lock().clone();
        let info = self.info.clone();
        Vehicle {
            id: info.id,
            make_name: info.make_name,
            model_name: info.model_name,
            plate_number: info.plate_number,
            seats: info.seats,
            price_group_id: info.price_group_id,
            price_group_name: info.price_group_name,
            images: info.images,
            schedules,
        }
    }
}

struct LocationSlot {
    id: i64,
    name: String,
    address: String,
    point: GeoPoint,
    lots: Vec<Lot>,
    has_slashed_vehicle: bool,
    postal_code: RwLock<String>,
    roster: RwLock<Vec<Arc<VehicleSlot>>>,
}

impl LocationSlot {
    fn summary(&self) -> LocationSummary {
        LocationSummary {
            id: self.id,
            name: self.name.clone(),
            postal_code: self.postal_code.read().clone(),
            address: self.address.clone(),
            point: self.point,
            lots: self.lots.clone(),
            has_slashed_vehicle: self.has_slashed_vehicle,
        }
    }

    fn snapshot(&self) -> Location {
        let summary = self.summary();
        let vehicles = self.roster.read().iter().map(|v| v.snapshot()).collect();
        Location {
            id: summary.id,
            name: summary.name,
            postal_code: summary.postal_code,
            address: summary.address,
            point: summary.point,
            lots: summary.lots,
            has_slashed_vehicle: summary.has_slashed_vehicle,
            vehicles,
        }
    }
}

/// Store de flota en memoria
#[derive(Default)]
pub struct MemoryFleetStore {
    locations: RwLock<BTreeMap<i64, Arc<LocationSlot>>>,
    last_location_id: AtomicI64,
    last_vehicle_id: AtomicI64,
}

impl MemoryFleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn find<'a>(
        map: &'a BTreeMap<i64, Arc<LocationSlot>>,
        key: &LocationRef,
    ) -> Option<&'a Arc<LocationSlot>> {
        match key {
            LocationRef::Id(id) => map.get(id),
            LocationRef::Name(name) => map.values().find(|slot| &slot.name == name),
        }
    }
}

#[async_trait]
impl FleetStore for MemoryFleetStore {
    async fn insert_location(&self, new: NewLocation) -> AppResult<Location> {
        let mut map = self.locations.write();
        if map.values().any(|slot| slot.name == new.name) {
            return Err(AppError::DuplicateName(new.name));
        }

        let id = self.last_location_id.fetch_add(1, Ordering::SeqCst) + 1;
        let location = Location::from_new(id, new);
        map.insert(
            id,
            Arc::new(LocationSlot {
                id,
                name: location.name.clone(),
                address: location.address.clone(),
                point: location.point,
                lots: location.lots.clone(),
                has_slashed_vehicle: location.has_slashed_vehicle,
                postal_code: RwLock::new(location.postal_code.clone()),
                roster: RwLock::new(Vec::new()),
            }),
        );
        debug!("📥 Carpark {} insertado en memoria", id);
        Ok(location)
    }

    async fn remove_location(&self, id: i64) -> AppResult<Option<Location>> {
        let removed = self.locations.write().remove(&id);
        Ok(removed.map(|slot| slot.snapshot()))
    }

    async fn location(&self, key: &LocationRef) -> AppResult<Option<Location>> {
        let map = self.locations.read();
        Ok(Self::find(&map, key).map(|slot| slot.snapshot()))
    }

    async fn location_by_postal_code(&self, postal_code: &str) -> AppResult<Option<Location>> {
        let map = self.locations.read();
        Ok(map
            .values()
            .find(|slot| *slot.postal_code.read() == postal_code)
            .map(|slot| slot.snapshot()))
    }

    async fn list_locations(&self) -> AppResult<Vec<LocationSummary>> {
        Ok(self.locations.read().values().map(|slot| slot.summary()).collect())
    }

    async fn update_postal_code(&self, name: &str, postal_code: &str) -> AppResult<bool> {
        let map = self.locations.read();
        match map.values().find(|slot| slot.name == name) {
            Some(slot) => {
                *slot.postal_code.write() = postal_code.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn location_points(&self) -> AppResult<Vec<(i64, GeoPoint)>> {
        Ok(self
            .locations
            .read()
            .values()
            .map(|slot| (slot.id, slot.point))
            .collect())
    }

    async fn insert_vehicle(&self, location: &LocationRef, new: NewVehicle) -> AppResult<Vehicle> {
        let map = self.locations.read();
        let slot = Self::find(&map, location).ok_or_else(|| location_not_found(location))?;

        let mut roster = slot.roster.write();
        if roster.iter().any(|v| v.info.plate_number == new.plate_number) {
            return Err(AppError::DuplicatePlate {
                location: slot.name.clone(),
                plate_number: new.plate_number,
            });
        }

        let id = self.last_vehicle_id.fetch_add(1, Ordering::SeqCst) + 1;
        let vehicle = Vehicle::from_new(id, new);
        roster.push(Arc::new(VehicleSlot {
            info: vehicle.summary(),
            schedules: Mutex::new(Vec::new()),
        }));
        Ok(vehicle)
    }

    async fn remove_vehicle(&self, location: &LocationRef, plate_number: &str) -> AppResult<Vehicle> {
        let map = self.locations.read();
        let slot = Self::find(&map, location).ok_or_else(|| location_not_found(location))?;

        let mut roster = slot.roster.write();
        let index = roster
            .iter()
            .position(|v| v.info.plate_number == plate_number)
            .ok_or_else(|| vehicle_not_found(location, format!("with plate {}", plate_number)))?;

        let removed = roster.remove(index);
        Ok(removed.snapshot())
    }

    async fn vehicle(&self, location_id: i64, vehicle_id: i64) -> AppResult<Option<Vehicle>> {
        let map = self.locations.read();
        let Some(slot) = map.get(&location_id) else {
            return Ok(None);
        };
        let roster = slot.roster.read();
        Ok(roster
            .iter()
            .find(|v| v.info.id == vehicle_id)
            .map(|v| v.snapshot()))
    }

    async fn push_schedule(
        &self,
        location_id: i64,
        vehicle_id: i64,
        schedule: Schedule,
    ) -> AppResult<ScheduleWrite> {
        let map = self.locations.read();
        let Some(slot) = map.get(&location_id) else {
            return Ok(ScheduleWrite::LocationMissing);
        };
        let roster = slot.roster.read();
        let Some(vehicle) = roster.iter().find(|v| v.info.id == vehicle_id) else {
            return Ok(ScheduleWrite::VehicleMissing);
        };

        // comprobación e inserción bajo el mismo lock del vehículo
        let mut schedules = vehicle.schedules.lock();
        if schedules.iter().any(|s| s.booking_id == schedule.booking_id) {
            return Ok(ScheduleWrite::DuplicateBooking);
        }
        if let Some(existing) = schedule.window.first_conflict(&schedules) {
            return Ok(ScheduleWrite::Conflict(existing.clone()));
        }

        let at = schedules.partition_point(|s| s.start() <= schedule.start());
        schedules.insert(at, schedule.clone());
        Ok(ScheduleWrite::Applied(schedule))
    }

    async fn pull_schedule(
        &self,
        location_id: i64,
        vehicle_id: i64,
        booking_id: i64,
    ) -> AppResult<ScheduleWrite> {
        let map = self.locations.read();
        let Some(slot) = map.get(&location_id) else {
            return Ok(ScheduleWrite::LocationMissing);
        };
        let roster = slot.roster.read();
        let Some(vehicle) = roster.iter().find(|v| v.info.id == vehicle_id) else {
            return Ok(ScheduleWrite::VehicleMissing);
        };

        let mut schedules = vehicle.schedules.lock();
        match schedules.iter().position(|s| s.booking_id == booking_id) {
            Some(index) => Ok(ScheduleWrite::Applied(schedules.remove(index))),
            None => Ok(ScheduleWrite::BookingMissing),
        }
    }
}
