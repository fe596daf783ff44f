#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database connection, schema, and CRUD queries for the accident analyser.
//!
//! Uses `switchy_database` for all database operations so the same query
//! code runs against `SQLite` (local development, tests) and `PostgreSQL`
//! (production) via `$n` placeholder SQL.

pub mod db;
pub mod queries;

use switchy_database::Database;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Creates all tables and indexes if they don't already exist.
///
/// The `accidents.date` column is `TEXT` in canonical `YYYY-MM-DD` form,
/// so the plain index supports the inclusive date-range filters used by
/// the analytics queries. The `users` table exists for credential storage
/// but no endpoint currently touches it.
///
/// The DDL is `SQLite`-flavored (`INTEGER PRIMARY KEY` rowid alias). A
/// `PostgreSQL` deployment provisions its schema externally; migration
/// tooling is out of scope.
///
/// # Errors
///
/// Returns [`DbError`] if any schema statement fails.
pub async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS accidents (
            id                       INTEGER PRIMARY KEY,
            severity                 TEXT NOT NULL,
            date                     TEXT NOT NULL,
            time                     TEXT,
            longitude                REAL,
            latitude                 REAL,
            address                  TEXT,
            local_authority          TEXT,
            lsoa_code                TEXT,
            road_type                TEXT,
            road_class               TEXT,
            speed_limit              INTEGER,
            junction_control         TEXT,
            weather_conditions       TEXT,
            light_conditions         TEXT,
            road_surface_conditions  TEXT,
            number_of_vehicles       INTEGER,
            number_of_casualties     INTEGER,
            police_force             TEXT,
            urban_or_rural_area      TEXT,
            description              TEXT
        )",
    )
    .await?;

    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_accidents_date ON accidents (date)")
        .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS users (
            id             INTEGER PRIMARY KEY,
            email          TEXT NOT NULL UNIQUE,
            password_hash  TEXT NOT NULL,
            created_at     TEXT NOT NULL
        )",
    )
    .await?;

    log::debug!("Database schema ensured");

    Ok(())
}
