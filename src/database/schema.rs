//! Esquema de PostgreSQL
//!
//! Tablas hijas con foreign key en lugar de arrays anidados: cada reserva
//! es una fila de `schedules` y cada vehículo una fila de `vehicles`.

use sqlx::PgPool;
use tracing::info;

const STATEMENTS: &[&str] = &[
    "CREATE SEQUENCE IF NOT EXISTS location_id_seq",
    "CREATE SEQUENCE IF NOT EXISTS vehicle_id_seq",
    r#"
    CREATE TABLE IF NOT EXISTS locations (
        id BIGINT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        postal_code TEXT NOT NULL,
        address TEXT NOT NULL,
        longitude DOUBLE PRECISION NOT NULL,
        latitude DOUBLE PRECISION NOT NULL,
        lots JSONB NOT NULL DEFAULT '[]',
        has_slashed_vehicle BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS locations_postal_code_idx ON locations (postal_code)",
    r#"
    CREATE TABLE IF NOT EXISTS vehicles (
        id BIGINT PRIMARY KEY,
        location_id BIGINT NOT NULL REFERENCES locations (id) ON DELETE CASCADE,
        make_name TEXT NOT NULL,
        model_name TEXT NOT NULL,
        plate_number TEXT NOT NULL,
        seats INTEGER NOT NULL,
        price_group_id BIGINT,
        price_group_name TEXT,
        images JSONB NOT NULL DEFAULT '[]',
        UNIQUE (location_id, plate_number)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS schedules (
        vehicle_id BIGINT NOT NULL REFERENCES vehicles (id) ON DELETE CASCADE,
        booking_id BIGINT NOT NULL,
        start_at TIMESTAMPTZ NOT NULL,
        end_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (vehicle_id, booking_id),
        CHECK (start_at < end_at)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS schedules_window_idx ON schedules (vehicle_id, start_at, end_at)",
    // Las secuencias nunca retroceden: ids eliminados no se reutilizan
    r#"
    SELECT setval(
        'location_id_seq',
        GREATEST(
            COALESCE((SELECT MAX(id) FROM locations), 0) + 1,
            (SELECT last_value + CASE WHEN is_called THEN 1 ELSE 0 END FROM location_id_seq)
        ),
        false
    )
    "#,
    r#"
    SELECT setval(
        'vehicle_id_seq',
        GREATEST(
            COALESCE((SELECT MAX(id) FROM vehicles), 0) + 1,
            (SELECT last_value + CASE WHEN is_called THEN 1 ELSE 0 END FROM vehicle_id_seq)
        ),
        false
    )
    "#,
];

/// Crear tablas, índices y secuencias si no existen
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("✅ Esquema de flota verificado ({} sentencias)", STATEMENTS.len());
    Ok(())
}
