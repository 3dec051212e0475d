//! SQLite-backed `DataSource`.
//!
//! Reads go straight to the tables on every call; nothing is cached, so the
//! aggregation tools always see the current rows.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use rusqlite::{params, Connection, Row};
use tracing::info;

use courtside_core::error::{CourtsideError, Result};
use courtside_core::store::{DataSource, Dataset};
use courtside_core::types::{
    Booking, BookingStatus, Facility, MembershipPlan, PricingRule, PromotionRule, SiteSettings,
    SportEvent, Timestamp, User, UserRole,
};

use crate::db::Database;

/// `DataSource` over the SQLite tables created by the migrations.
#[derive(Debug, Clone)]
pub struct SqliteDataSource {
    db: Arc<Database>,
}

impl SqliteDataSource {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Replace every row with the contents of `data` in one transaction.
    pub fn import_dataset(&self, data: &Dataset) -> Result<()> {
        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction().map_err(storage)?;
            tx.execute_batch(
                "DELETE FROM facilities; DELETE FROM users; DELETE FROM bookings;
                 DELETE FROM site_settings; DELETE FROM events; DELETE FROM membership_plans;
                 DELETE FROM pricing_rules; DELETE FROM promotion_rules;",
            )
            .map_err(storage)?;

            for f in &data.facilities {
                tx.execute(
                    "INSERT INTO facilities (id, name, sport_type, location, price_per_hour, rating, amenities, owner_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        f.id,
                        f.name,
                        f.sport_type,
                        f.location,
                        f.price_per_hour,
                        f.rating,
                        serde_json::to_string(&f.amenities)?,
                        f.owner_id,
                    ],
                )
                .map_err(storage)?;
            }

            for u in &data.users {
                tx.execute(
                    "INSERT INTO users (id, name, email, role) VALUES (?1, ?2, ?3, ?4)",
                    params![u.id, u.name, u.email, u.role.to_string()],
                )
                .map_err(storage)?;
            }

            for b in &data.bookings {
                tx.execute(
                    "INSERT INTO bookings (id, user_id, facility_id, facility_name, sport_name, date,
                                           start_time, end_time, total_price, status, booked_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        b.id,
                        b.user_id,
                        b.facility_id,
                        b.facility_name,
                        b.sport_name,
                        b.date.to_string(),
                        b.start_time,
                        b.end_time,
                        b.total_price,
                        b.status.to_string(),
                        b.booked_at.timestamp_millis(),
                    ],
                )
                .map_err(storage)?;
            }

            tx.execute(
                "INSERT INTO site_settings (id, site_name, default_currency) VALUES (1, ?1, ?2)",
                params![data.settings.site_name, data.settings.default_currency],
            )
            .map_err(storage)?;

            for e in &data.events {
                tx.execute(
                    "INSERT INTO events (id, name, facility_id, sport_name, start_date, end_date, entry_fee, max_participants)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        e.id,
                        e.name,
                        e.facility_id,
                        e.sport_name,
                        e.start_date.to_string(),
                        e.end_date.to_string(),
                        e.entry_fee,
                        e.max_participants,
                    ],
                )
                .map_err(storage)?;
            }

            for p in &data.membership_plans {
                tx.execute(
                    "INSERT INTO membership_plans (id, name, price_per_month, benefits) VALUES (?1, ?2, ?3, ?4)",
                    params![p.id, p.name, p.price_per_month, serde_json::to_string(&p.benefits)?],
                )
                .map_err(storage)?;
            }

            for r in &data.pricing_rules {
                tx.execute(
                    "INSERT INTO pricing_rules (id, name, facility_id, multiplier, days_of_week, start_time, end_time)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        r.id,
                        r.name,
                        r.facility_id,
                        r.multiplier,
                        serde_json::to_string(&r.days_of_week)?,
                        r.start_time,
                        r.end_time,
                    ],
                )
                .map_err(storage)?;
            }

            for r in &data.promotion_rules {
                tx.execute(
                    "INSERT INTO promotion_rules (id, name, code, discount_percent, valid_from, valid_to, active)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        r.id,
                        r.name,
                        r.code,
                        r.discount_percent,
                        r.valid_from.to_string(),
                        r.valid_to.to_string(),
                        r.active as i32,
                    ],
                )
                .map_err(storage)?;
            }

            tx.commit().map_err(storage)?;
            info!(
                facilities = data.facilities.len(),
                bookings = data.bookings.len(),
                "Dataset imported"
            );
            Ok(())
        })
    }
}

#[async_trait]
impl DataSource for SqliteDataSource {
    async fn facilities(&self) -> Result<Vec<Facility>> {
        self.db.with_conn(|conn| {
            query_all(
                conn,
                "SELECT id, name, sport_type, location, price_per_hour, rating, amenities, owner_id
                 FROM facilities ORDER BY rowid",
                row_to_facility,
            )
        })
    }

    async fn users(&self) -> Result<Vec<User>> {
        self.db.with_conn(|conn| {
            query_all(
                conn,
                "SELECT id, name, email, role FROM users ORDER BY rowid",
                row_to_user,
            )
        })
    }

    async fn bookings(&self) -> Result<Vec<Booking>> {
        self.db.with_conn(|conn| {
            query_all(
                conn,
                "SELECT id, user_id, facility_id, facility_name, sport_name, date, start_time,
                        end_time, total_price, status, booked_at
                 FROM bookings ORDER BY rowid",
                row_to_booking,
            )
        })
    }

    async fn site_settings(&self) -> Result<SiteSettings> {
        let found = self.db.with_conn(|conn| {
            query_one(
                conn,
                "SELECT site_name, default_currency FROM site_settings WHERE id = ?1",
                "1",
                |row| {
                    Ok(SiteSettings {
                        site_name: row.get(0).map_err(storage)?,
                        default_currency: row.get(1).map_err(storage)?,
                    })
                },
            )
        })?;
        Ok(found.unwrap_or_default())
    }

    async fn event(&self, id: &str) -> Result<Option<SportEvent>> {
        self.db.with_conn(|conn| {
            query_one(
                conn,
                "SELECT id, name, facility_id, sport_name, start_date, end_date, entry_fee, max_participants
                 FROM events WHERE id = ?1",
                id,
                row_to_event,
            )
        })
    }

    async fn membership_plan(&self, id: &str) -> Result<Option<MembershipPlan>> {
        self.db.with_conn(|conn| {
            query_one(
                conn,
                "SELECT id, name, price_per_month, benefits FROM membership_plans WHERE id = ?1",
                id,
                |row| {
                    Ok(MembershipPlan {
                        id: row.get(0).map_err(storage)?,
                        name: row.get(1).map_err(storage)?,
                        price_per_month: row.get(2).map_err(storage)?,
                        benefits: json_list(row, 3)?,
                    })
                },
            )
        })
    }

    async fn pricing_rule(&self, id: &str) -> Result<Option<PricingRule>> {
        self.db.with_conn(|conn| {
            query_one(
                conn,
                "SELECT id, name, facility_id, multiplier, days_of_week, start_time, end_time
                 FROM pricing_rules WHERE id = ?1",
                id,
                |row| {
                    Ok(PricingRule {
                        id: row.get(0).map_err(storage)?,
                        name: row.get(1).map_err(storage)?,
                        facility_id: row.get(2).map_err(storage)?,
                        multiplier: row.get(3).map_err(storage)?,
                        days_of_week: json_list(row, 4)?,
                        start_time: row.get(5).map_err(storage)?,
                        end_time: row.get(6).map_err(storage)?,
                    })
                },
            )
        })
    }

    async fn promotion_rule(&self, id: &str) -> Result<Option<PromotionRule>> {
        self.db.with_conn(|conn| {
            query_one(
                conn,
                "SELECT id, name, code, discount_percent, valid_from, valid_to, active
                 FROM promotion_rules WHERE id = ?1",
                id,
                |row| {
                    let active: i64 = row.get(6).map_err(storage)?;
                    Ok(PromotionRule {
                        id: row.get(0).map_err(storage)?,
                        name: row.get(1).map_err(storage)?,
                        code: row.get(2).map_err(storage)?,
                        discount_percent: row.get(3).map_err(storage)?,
                        valid_from: date_col(row, 4)?,
                        valid_to: date_col(row, 5)?,
                        active: active != 0,
                    })
                },
            )
        })
    }
}

// =============================================================================
// Row helpers
// =============================================================================

fn storage(e: rusqlite::Error) -> CourtsideError {
    CourtsideError::Storage(e.to_string())
}

fn query_all<T>(
    conn: &Connection,
    sql: &str,
    map: fn(&Row<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql).map_err(storage)?;
    let mut rows = stmt.query([]).map_err(storage)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(storage)? {
        out.push(map(row)?);
    }
    Ok(out)
}

fn query_one<T>(
    conn: &Connection,
    sql: &str,
    id: &str,
    map: fn(&Row<'_>) -> Result<T>,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql).map_err(storage)?;
    let mut rows = stmt.query([id]).map_err(storage)?;
    match rows.next().map_err(storage)? {
        Some(row) => Ok(Some(map(row)?)),
        None => Ok(None),
    }
}

fn json_list(row: &Row<'_>, idx: usize) -> Result<Vec<String>> {
    let raw: String = row.get(idx).map_err(storage)?;
    Ok(serde_json::from_str(&raw)?)
}

fn date_col(row: &Row<'_>, idx: usize) -> Result<NaiveDate> {
    let raw: String = row.get(idx).map_err(storage)?;
    raw.parse::<NaiveDate>()
        .map_err(|e| CourtsideError::Storage(format!("Invalid date '{}': {}", raw, e)))
}

fn timestamp_col(row: &Row<'_>, idx: usize) -> Result<Timestamp> {
    let millis: i64 = row.get(idx).map_err(storage)?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| CourtsideError::Storage(format!("Invalid timestamp: {}", millis)))
}

fn row_to_facility(row: &Row<'_>) -> Result<Facility> {
    Ok(Facility {
        id: row.get(0).map_err(storage)?,
        name: row.get(1).map_err(storage)?,
        sport_type: row.get(2).map_err(storage)?,
        location: row.get(3).map_err(storage)?,
        price_per_hour: row.get(4).map_err(storage)?,
        rating: row.get(5).map_err(storage)?,
        amenities: json_list(row, 6)?,
        owner_id: row.get(7).map_err(storage)?,
    })
}

fn row_to_user(row: &Row<'_>) -> Result<User> {
    let role: String = row.get(3).map_err(storage)?;
    Ok(User {
        id: row.get(0).map_err(storage)?,
        name: row.get(1).map_err(storage)?,
        email: row.get(2).map_err(storage)?,
        role: role
            .parse::<UserRole>()
            .map_err(CourtsideError::Storage)?,
    })
}

fn row_to_booking(row: &Row<'_>) -> Result<Booking> {
    let status: String = row.get(9).map_err(storage)?;
    Ok(Booking {
        id: row.get(0).map_err(storage)?,
        user_id: row.get(1).map_err(storage)?,
        facility_id: row.get(2).map_err(storage)?,
        facility_name: row.get(3).map_err(storage)?,
        sport_name: row.get(4).map_err(storage)?,
        date: date_col(row, 5)?,
        start_time: row.get(6).map_err(storage)?,
        end_time: row.get(7).map_err(storage)?,
        total_price: row.get(8).map_err(storage)?,
        status: status
            .parse::<BookingStatus>()
            .map_err(CourtsideError::Storage)?,
        booked_at: timestamp_col(row, 10)?,
    })
}

fn row_to_event(row: &Row<'_>) -> Result<SportEvent> {
    Ok(SportEvent {
        id: row.get(0).map_err(storage)?,
        name: row.get(1).map_err(storage)?,
        facility_id: row.get(2).map_err(storage)?,
        sport_name: row.get(3).map_err(storage)?,
        start_date: date_col(row, 4)?,
        end_date: date_col(row, 5)?,
        entry_fee: row.get(6).map_err(storage)?,
        max_participants: row.get(7).map_err(storage)?,
    })
}
