//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use courtside_core::error::CourtsideError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), CourtsideError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| CourtsideError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| {
            CourtsideError::Storage(format!("Failed to query migration version: {}", e))
        })?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: booking collections and site settings.
///
/// List-valued columns hold JSON arrays.
fn apply_v1(conn: &Connection) -> Result<(), CourtsideError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS facilities (
            id              TEXT PRIMARY KEY NOT NULL,
            name            TEXT NOT NULL,
            sport_type      TEXT NOT NULL,
            location        TEXT NOT NULL,
            price_per_hour  REAL NOT NULL,
            rating          REAL NOT NULL DEFAULT 0.0,
            amenities       TEXT NOT NULL DEFAULT '[]',
            owner_id        TEXT
        );

        CREATE TABLE IF NOT EXISTS users (
            id      TEXT PRIMARY KEY NOT NULL,
            name    TEXT NOT NULL,
            email   TEXT NOT NULL,
            role    TEXT NOT NULL DEFAULT 'user'
                    CHECK (role IN ('user', 'owner', 'admin'))
        );

        CREATE TABLE IF NOT EXISTS bookings (
            id              TEXT PRIMARY KEY NOT NULL,
            user_id         TEXT NOT NULL,
            facility_id     TEXT NOT NULL,
            facility_name   TEXT NOT NULL,
            sport_name      TEXT NOT NULL,
            date            TEXT NOT NULL,
            start_time      TEXT NOT NULL,
            end_time        TEXT NOT NULL,
            total_price     REAL NOT NULL,
            status          TEXT NOT NULL
                            CHECK (status IN ('Confirmed', 'Pending', 'Cancelled')),
            booked_at       INTEGER NOT NULL -- unix millis
        );

        CREATE INDEX IF NOT EXISTS idx_bookings_booked_at
            ON bookings (booked_at ASC);

        CREATE TABLE IF NOT EXISTS site_settings (
            id                  INTEGER PRIMARY KEY CHECK (id = 1),
            site_name           TEXT NOT NULL,
            default_currency    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            id                  TEXT PRIMARY KEY NOT NULL,
            name                TEXT NOT NULL,
            facility_id         TEXT NOT NULL,
            sport_name          TEXT NOT NULL,
            start_date          TEXT NOT NULL,
            end_date            TEXT NOT NULL,
            entry_fee           REAL NOT NULL,
            max_participants    INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS membership_plans (
            id              TEXT PRIMARY KEY NOT NULL,
            name            TEXT NOT NULL,
            price_per_month REAL NOT NULL,
            benefits        TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS pricing_rules (
            id              TEXT PRIMARY KEY NOT NULL,
            name            TEXT NOT NULL,
            facility_id     TEXT,
            multiplier      REAL NOT NULL,
            days_of_week    TEXT NOT NULL DEFAULT '[]',
            start_time      TEXT,
            end_time        TEXT
        );

        CREATE TABLE IF NOT EXISTS promotion_rules (
            id                  TEXT PRIMARY KEY NOT NULL,
            name                TEXT NOT NULL,
            code                TEXT NOT NULL,
            discount_percent    REAL NOT NULL,
            valid_from          TEXT NOT NULL,
            valid_to            TEXT NOT NULL,
            active              INTEGER NOT NULL DEFAULT 1
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| CourtsideError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
