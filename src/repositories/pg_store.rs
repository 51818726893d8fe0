//! Store PostgreSQL
//!
//! Implementación de [`FleetStore`] sobre SQLx. Las reservas viven en una
//! tabla hija; la inserción de una reserva bloquea la fila del vehículo
//! (`FOR UPDATE`) antes de buscar solapamientos, así que dos inserciones
//! concurrentes sobre el mismo vehículo se serializan.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use super::{FleetStore, ScheduleWrite};
use crate::models::{
    GeoPoint, Location, LocationRef, LocationSummary, Lot, NewLocation, NewVehicle, Schedule,
    TimeWindow, Vehicle,
};
use crate::utils::errors::{location_not_found, vehicle_not_found, AppError, AppResult};

const LOCATION_COLUMNS: &str =
    "id, name, postal_code, address, longitude, latitude, lots, has_slashed_vehicle";
const VEHICLE_COLUMNS: &str = "id, location_id, make_name, model_name, plate_number, seats, \
     price_group_id, price_group_name, images";

#[derive(Debug, sqlx::FromRow)]
struct LocationRow {
    id: i64,
    name: String,
    postal_code: String,
    address: String,
    longitude: f64,
    latitude: f64,
    lots: Json<Vec<Lot>>,
    has_slashed_vehicle: bool,
}

impl LocationRow {
    fn into_summary(self) -> LocationSummary {
        LocationSummary {
            id: self.id,
            name: self.name,
            postal_code: self.postal_code,
            address: self.address,
            point: GeoPoint::new(self.longitude, self.latitude),
            lots: self.lots.0,
            has_slashed_vehicle: self.has_slashed_vehicle,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VehicleRow {
    id: i64,
    #[allow(dead_code)]
    location_id: i64,
    make_name: String,
    model_name: String,
    plate_number: String,
    seats: i32,
    price_group_id: Option<i64>,
    price_group_name: Option<String>,
    images: Json<Vec<String>>,
}

impl VehicleRow {
    fn into_vehicle(self, schedules: Vec<Schedule>) -> Vehicle {
        Vehicle {
            id: self.id,
            make_name: self.make_name,
            model_name: self.model_name,
            plate_number: self.plate_number,
            seats: self.seats,
            price_group_id: self.price_group_id,
            price_group_name: self.price_group_name,
            images: self.images.0,
            schedules,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ScheduleRow {
    vehicle_id: i64,
    booking_id: i64,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
}

impl ScheduleRow {
    fn into_schedule(self) -> AppResult<Schedule> {
        let window = TimeWindow::new(self.start_at, self.end_at).map_err(|e| {
            AppError::Internal(format!("stored booking {} is corrupt: {}", self.booking_id, e))
        })?;
        Ok(Schedule::new(self.booking_id, window))
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Store de flota sobre PostgreSQL
#[derive(Clone)]
pub struct PgFleetStore {
    pool: PgPool,
}

impl PgFleetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_location_row(
        conn: &mut PgConnection,
        key: &LocationRef,
        lock: &str,
    ) -> Result<Option<LocationRow>, sqlx::Error> {
        match key {
            LocationRef::Id(id) => {
                let sql = format!("SELECT {} FROM locations WHERE id = $1 {}", LOCATION_COLUMNS, lock);
                sqlx::query_as::<_, LocationRow>(&sql)
                    .bind(*id)
                    .fetch_optional(&mut *conn)
                    .await
            }
            LocationRef::Name(name) => {
                let sql = format!("SELECT {} FROM locations WHERE name = $1 {}", LOCATION_COLUMNS, lock);
                sqlx::query_as::<_, LocationRow>(&sql)
                    .bind(name)
                    .fetch_optional(&mut *conn)
                    .await
            }
        }
    }

    async fn schedules_for(
        conn: &mut PgConnection,
        vehicle_ids: &[i64],
    ) -> AppResult<HashMap<i64, Vec<Schedule>>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(
            "SELECT vehicle_id, booking_id, start_at, end_at FROM schedules \
             WHERE vehicle_id = ANY($1) ORDER BY vehicle_id, start_at",
        )
        .bind(vehicle_ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut grouped: HashMap<i64, Vec<Schedule>> = HashMap::new();
        for row in rows {
            let vehicle_id = row.vehicle_id;
            grouped.entry(vehicle_id).or_default().push(row.into_schedule()?);
        }
        Ok(grouped)
    }

    async fn hydrate(conn: &mut PgConnection, row: LocationRow) -> AppResult<Location> {
        let sql = format!(
            "SELECT {} FROM vehicles WHERE location_id = $1 ORDER BY id",
            VEHICLE_COLUMNS
        );
        let vehicle_rows = sqlx::query_as::<_, VehicleRow>(&sql)
            .bind(row.id)
            .fetch_all(&mut *conn)
            .await?;

        let ids: Vec<i64> = vehicle_rows.iter().map(|v| v.id).collect();
        let mut schedules = Self::schedules_for(conn, &ids).await?;

        let vehicles = vehicle_rows
            .into_iter()
            .map(|v| {
                let own = schedules.remove(&v.id).unwrap_or_default();
                v.into_vehicle(own)
            })
            .collect();

        let summary = row.into_summary();
        Ok(Location {
            id: summary.id,
            name: summary.name,
            postal_code: summary.postal_code,
            address: summary.address,
            point: summary.point,
            lots: summary.lots,
            has_slashed_vehicle: summary.has_slashed_vehicle,
            vehicles,
        })
    }

    async fn load_vehicle(
        conn: &mut PgConnection,
        location_id: i64,
        vehicle_id: i64,
    ) -> AppResult<Option<Vehicle>> {
        let sql = format!(
            "SELECT {} FROM vehicles WHERE id = $1 AND location_id = $2",
            VEHICLE_COLUMNS
        );
        let row = sqlx::query_as::<_, VehicleRow>(&sql)
            .bind(vehicle_id)
            .bind(location_id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => {
                let mut schedules = Self::schedules_for(conn, &[row.id]).await?;
                let own = schedules.remove(&row.id).unwrap_or_default();
                Ok(Some(row.into_vehicle(own)))
            }
            None => Ok(None),
        }
    }

    /// Bloquea la fila del vehículo; distingue carpark ausente de vehículo ausente
    async fn lock_vehicle(
        conn: &mut PgConnection,
        location_id: i64,
        vehicle_id: i64,
    ) -> AppResult<Option<ScheduleWrite>> {
        let locked: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM vehicles WHERE id = $1 AND location_id = $2 FOR UPDATE")
                .bind(vehicle_id)
                .bind(location_id)
                .fetch_optional(&mut *conn)
                .await?;
        if locked.is_some() {
            return Ok(None);
        }

        let (location_exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM locations WHERE id = $1)")
                .bind(location_id)
                .fetch_one(&mut *conn)
                .await?;
        Ok(Some(if location_exists {
            ScheduleWrite::VehicleMissing
        } else {
            ScheduleWrite::LocationMissing
        }))
    }
}

#[async_trait]
impl FleetStore for PgFleetStore {
    async fn insert_location(&self, new: NewLocation) -> AppResult<Location> {
        let mut tx = self.pool.begin().await?;
        // Serializa las altas: el nombre se comprueba antes de consumir la secuencia
        sqlx::query("LOCK TABLE locations IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        let key = LocationRef::Name(new.name.clone());
        if Self::find_location_row(&mut tx, &key, "").await?.is_some() {
            return Err(AppError::DuplicateName(new.name));
        }

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO locations (id, name, postal_code, address, longitude, latitude, lots, has_slashed_vehicle)
            VALUES (nextval('location_id_seq'), $1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&new.name)
        .bind(&new.postal_code)
        .bind(&new.address)
        .bind(new.point.longitude)
        .bind(new.point.latitude)
        .bind(Json(&new.lots))
        .bind(new.has_slashed_vehicle)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateName(new.name.clone())
            } else {
                AppError::from(e)
            }
        })?;
        tx.commit().await?;

        debug!("📥 Carpark {} insertado en PostgreSQL", id);
        Ok(Location::from_new(id, new))
    }

    async fn remove_location(&self, id: i64) -> AppResult<Option<Location>> {
        let mut tx = self.pool.begin().await?;
        let Some(row) = Self::find_location_row(&mut tx, &LocationRef::Id(id), "FOR UPDATE").await? else {
            tx.commit().await?;
            return Ok(None);
        };
        let location = Self::hydrate(&mut tx, row).await?;

        sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(location))
    }

    async fn location(&self, key: &LocationRef) -> AppResult<Option<Location>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let location = match Self::find_location_row(&mut tx, key, "").await? {
            Some(row) => Some(Self::hydrate(&mut tx, row).await?),
            None => None,
        };
        tx.commit().await?;
        Ok(location)
    }

    async fn location_by_postal_code(&self, postal_code: &str) -> AppResult<Option<Location>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            "SELECT {} FROM locations WHERE postal_code = $1 ORDER BY id LIMIT 1",
            LOCATION_COLUMNS
        );
        let row = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(postal_code)
            .fetch_optional(&mut *tx)
            .await?;

        let location = match row {
            Some(row) => Some(Self::hydrate(&mut tx, row).await?),
            None => None,
        };
        tx.commit().await?;
        Ok(location)
    }

    async fn list_locations(&self) -> AppResult<Vec<LocationSummary>> {
        let sql = format!("SELECT {} FROM locations ORDER BY id", LOCATION_COLUMNS);
        let rows = sqlx::query_as::<_, LocationRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(LocationRow::into_summary).collect())
    }

    async fn update_postal_code(&self, name: &str, postal_code: &str) -> AppResult<bool> {
        let result = sqlx::query("UPDATE locations SET postal_code = $2 WHERE name = $1")
            .bind(name)
            .bind(postal_code)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn location_points(&self) -> AppResult<Vec<(i64, GeoPoint)>> {
        let rows: Vec<(i64, f64, f64)> =
            sqlx::query_as("SELECT id, longitude, latitude FROM locations ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, lon, lat)| (id, GeoPoint::new(lon, lat)))
            .collect())
    }

    async fn insert_vehicle(&self, location: &LocationRef, new: NewVehicle) -> AppResult<Vehicle> {
        let mut tx = self.pool.begin().await?;
        // FOR UPDATE serializa las altas del mismo carpark
        let row = Self::find_location_row(&mut tx, location, "FOR UPDATE")
            .await?
            .ok_or_else(|| location_not_found(location))?;

        let taken: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM vehicles WHERE location_id = $1 AND plate_number = $2")
                .bind(row.id)
                .bind(&new.plate_number)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(AppError::DuplicatePlate {
                location: row.name,
                plate_number: new.plate_number,
            });
        }

        let inserted: Result<(i64,), sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO vehicles (id, location_id, make_name, model_name, plate_number, seats, price_group_id, price_group_name, images)
            VALUES (nextval('vehicle_id_seq'), $1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(row.id)
        .bind(&new.make_name)
        .bind(&new.model_name)
        .bind(&new.plate_number)
        .bind(new.seats)
        .bind(new.price_group_id)
        .bind(&new.price_group_name)
        .bind(Json(&new.images))
        .fetch_one(&mut *tx)
        .await;

        let (id,) = match inserted {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::DuplicatePlate {
                    location: row.name,
                    plate_number: new.plate_number,
                })
            }
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;
        Ok(Vehicle::from_new(id, new))
    }

    async fn remove_vehicle(&self, location: &LocationRef, plate_number: &str) -> AppResult<Vehicle> {
        let mut tx = self.pool.begin().await?;
        let row = Self::find_location_row(&mut tx, location, "FOR SHARE")
            .await?
            .ok_or_else(|| location_not_found(location))?;

        let sql = format!(
            "SELECT {} FROM vehicles WHERE location_id = $1 AND plate_number = $2 FOR UPDATE",
            VEHICLE_COLUMNS
        );
        let vehicle_row = sqlx::query_as::<_, VehicleRow>(&sql)
            .bind(row.id)
            .bind(plate_number)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| vehicle_not_found(location, format!("with plate {}", plate_number)))?;

        let mut schedules = Self::schedules_for(&mut tx, &[vehicle_row.id]).await?;
        let own = schedules.remove(&vehicle_row.id).unwrap_or_default();
        let vehicle = vehicle_row.into_vehicle(own);

        // las reservas se eliminan en cascada
        sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(vehicle.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(vehicle)
    }

    async fn vehicle(&self, location_id: i64, vehicle_id: i64) -> AppResult<Option<Vehicle>> {
        let mut conn = self.pool.acquire().await?;
        Self::load_vehicle(&mut conn, location_id, vehicle_id).await
    }

    async fn push_schedule(
        &self,
        location_id: i64,
        vehicle_id: i64,
        schedule: Schedule,
    ) -> AppResult<ScheduleWrite> {
        let mut tx = self.pool.begin().await?;
        if let Some(missing) = Self::lock_vehicle(&mut tx, location_id, vehicle_id).await? {
            tx.rollback().await?;
            return Ok(missing);
        }

        let duplicate: Option<(i64,)> =
            sqlx::query_as("SELECT booking_id FROM schedules WHERE vehicle_id = $1 AND booking_id = $2")
                .bind(vehicle_id)
                .bind(schedule.booking_id)
                .fetch_optional(&mut *tx)
                .await?;
        if duplicate.is_some() {
            tx.rollback().await?;
            return Ok(ScheduleWrite::DuplicateBooking);
        }

        let conflict = sqlx::query_as::<_, ScheduleRow>(
            "SELECT vehicle_id, booking_id, start_at, end_at FROM schedules \
             WHERE vehicle_id = $1 AND start_at < $3 AND end_at > $2 \
             ORDER BY start_at LIMIT 1",
        )
        .bind(vehicle_id)
        .bind(schedule.start())
        .bind(schedule.end())
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(existing) = conflict {
            tx.rollback().await?;
            return Ok(ScheduleWrite::Conflict(existing.into_schedule()?));
        }

        sqlx::query(
            "INSERT INTO schedules (vehicle_id, booking_id, start_at, end_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(vehicle_id)
        .bind(schedule.booking_id)
        .bind(schedule.start())
        .bind(schedule.end())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(ScheduleWrite::Applied(schedule))
    }

    async fn pull_schedule(
        &self,
        location_id: i64,
        vehicle_id: i64,
        booking_id: i64,
    ) -> AppResult<ScheduleWrite> {
        let mut tx = self.pool.begin().await?;
        if let Some(missing) = Self::lock_vehicle(&mut tx, location_id, vehicle_id).await? {
            tx.rollback().await?;
            return Ok(missing);
        }

        let removed = sqlx::query_as::<_, ScheduleRow>(
            "DELETE FROM schedules WHERE vehicle_id = $1 AND booking_id = $2 \
             RETURNING vehicle_id, booking_id, start_at, end_at",
        )
        .bind(vehicle_id)
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        match removed {
            Some(row) => Ok(ScheduleWrite::Applied(row.into_schedule()?)),
            None => Ok(ScheduleWrite::BookingMissing),
        }
    }
}
