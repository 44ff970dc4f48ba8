//! PostgreSQL booking store
//!
//! The partial unique index `bookings_active_desk_day` enforces the
//! one-active-booking-per-desk-per-day guard, so inserts and updates are
//! single statements that either win the slot or report the occupant.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::error::DatabaseError;
use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use tracing::{info, warn};
use uuid::Uuid;

use super::{BookingStore, InsertOutcome, StoreError, StoreResult};
use crate::calendar::DayWindow;
use crate::models::{Booking, BookingChanges, BookingStatus, NewBooking};

const UNIQUE_VIOLATION: &str = "23505";

const COLUMNS: &str = "id, name, user_id, desk_id, date_timestamp, date_key, status, \
     created_at, cancelled_at, cancellation_reason, old_modifications";

/// Booking store for database operations
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    /// Create a new booking store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        info!("Booking schema is up to date");
        Ok(())
    }

    async fn fetch_many(&self, sql: &str, bind: Vec<BindValue<'_>>) -> StoreResult<Vec<Booking>> {
        let mut query = sqlx::query(sql);
        for value in bind {
            query = match value {
                BindValue::Text(text) => query.bind(text),
                BindValue::Instant(instant) => query.bind(instant),
            };
        }
        query
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?
            .iter()
            .map(booking_from_row)
            .collect()
    }

    async fn active_occupant(&self, desk_id: &str, date_key: NaiveDate) -> StoreResult<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM bookings
            WHERE desk_id = $1 AND date_key = $2 AND status = 'active'
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(desk_id)
        .bind(date_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(id)
    }
}

enum BindValue<'a> {
    Text(&'a str),
    Instant(DateTime<Utc>),
}

fn booking_from_row(row: &PgRow) -> StoreResult<Booking> {
    let status: String = row.try_get("status").map_err(DatabaseError::Query)?;
    let status = BookingStatus::parse(&status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown status {status:?}")))?;
    let Json(old_modifications): Json<Vec<Value>> = row
        .try_get("old_modifications")
        .map_err(DatabaseError::Query)?;

    Ok(Booking {
        id: row.try_get("id").map_err(DatabaseError::Query)?,
        name: row.try_get("name").map_err(DatabaseError::Query)?,
        user_id: row.try_get("user_id").map_err(DatabaseError::Query)?,
        desk_id: row.try_get("desk_id").map_err(DatabaseError::Query)?,
        date_timestamp: row.try_get("date_timestamp").map_err(DatabaseError::Query)?,
        status,
        created_at: row.try_get("created_at").map_err(DatabaseError::Query)?,
        cancelled_at: row.try_get("cancelled_at").map_err(DatabaseError::Query)?,
        cancellation_reason: row
            .try_get("cancellation_reason")
            .map_err(DatabaseError::Query)?,
        old_modifications,
        date_key: row.try_get("date_key").map_err(DatabaseError::Query)?,
    })
}

fn is_unique_violation(err: &DatabaseError) -> bool {
    err.sqlstate().as_deref() == Some(UNIQUE_VIOLATION)
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn find_active_in_window(
        &self,
        desk_id: &str,
        window: &DayWindow,
    ) -> StoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM bookings \
             WHERE desk_id = $1 AND status = 'active' \
               AND date_timestamp >= $2 AND date_timestamp < $3 \
             ORDER BY created_at ASC"
        );
        self.fetch_many(
            &sql,
            vec![
                BindValue::Text(desk_id),
                BindValue::Instant(window.start),
                BindValue::Instant(window.end),
            ],
        )
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let sql = format!("SELECT {COLUMNS} FROM bookings WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(booking_from_row).transpose()
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM bookings WHERE name = $1 \
             ORDER BY date_timestamp ASC, created_at ASC"
        );
        self.fetch_many(&sql, vec![BindValue::Text(name)]).await
    }

    async fn find_by_user(&self, user_id: &str) -> StoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM bookings WHERE user_id = $1 \
             ORDER BY date_timestamp ASC, created_at ASC"
        );
        self.fetch_many(&sql, vec![BindValue::Text(user_id)]).await
    }

    async fn find_in_window(&self, window: &DayWindow) -> StoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM bookings \
             WHERE date_timestamp >= $1 AND date_timestamp < $2 \
             ORDER BY date_timestamp ASC, created_at ASC"
        );
        self.fetch_many(
            &sql,
            vec![
                BindValue::Instant(window.start),
                BindValue::Instant(window.end),
            ],
        )
        .await
    }

    async fn find_all(&self) -> StoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM bookings ORDER BY date_timestamp ASC, created_at ASC"
        );
        self.fetch_many(&sql, Vec::new()).await
    }

    async fn insert_if_vacant(&self, booking: NewBooking) -> StoreResult<InsertOutcome> {
        let sql = format!(
            "INSERT INTO bookings \
                 (id, name, user_id, desk_id, date_timestamp, date_key, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 'active', $7) \
             ON CONFLICT (desk_id, date_key) WHERE status = 'active' DO NOTHING \
             RETURNING {COLUMNS}"
        );

        // The occupant can be cancelled between the refused insert and the
        // lookup; one more attempt settles it either way.
        for _ in 0..2 {
            let row = sqlx::query(&sql)
                .bind(Uuid::new_v4())
                .bind(&booking.name)
                .bind(&booking.user_id)
                .bind(&booking.desk_id)
                .bind(booking.date_timestamp)
                .bind(booking.date_key)
                .bind(booking.created_at)
                .fetch_optional(&self.pool)
                .await
                .map_err(DatabaseError::Query)?;

            if let Some(row) = row {
                return booking_from_row(&row).map(InsertOutcome::Inserted);
            }
            if let Some(existing_id) = self
                .active_occupant(&booking.desk_id, booking.date_key)
                .await?
            {
                return Ok(InsertOutcome::Occupied { existing_id });
            }
            warn!(desk_id = %booking.desk_id, "Booking slot changed hands during insert, retrying");
        }

        Err(StoreError::Contention {
            desk_id: booking.desk_id,
        })
    }

    async fn update(&self, id: Uuid, changes: BookingChanges) -> StoreResult<Option<Booking>> {
        let sql = format!(
            "UPDATE bookings SET \
                 name = COALESCE($2, name), \
                 user_id = COALESCE($3, user_id), \
                 desk_id = COALESCE($4, desk_id), \
                 date_timestamp = COALESCE($5, date_timestamp), \
                 date_key = COALESCE($6, date_key), \
                 old_modifications = old_modifications || jsonb_build_array($7::jsonb) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(changes.name.as_deref())
            .bind(changes.user_id.as_deref())
            .bind(changes.desk_id.as_deref())
            .bind(changes.date.map(|(instant, _)| instant))
            .bind(changes.date.map(|(_, key)| key))
            .bind(Json(&changes.snapshot))
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query);

        match result {
            Ok(row) => row.as_ref().map(booking_from_row).transpose(),
            Err(err) if is_unique_violation(&err) => {
                let occupant = sqlx::query_scalar::<_, Uuid>(
                    r#"
                    SELECT other.id
                    FROM bookings AS current, bookings AS other
                    WHERE current.id = $1
                      AND other.id <> $1
                      AND other.status = 'active'
                      AND other.desk_id = COALESCE($2, current.desk_id)
                      AND other.date_key = COALESCE($3, current.date_key)
                    LIMIT 1
                    "#,
                )
                .bind(id)
                .bind(changes.desk_id.as_deref())
                .bind(changes.date.map(|(_, key)| key))
                .fetch_optional(&self.pool)
                .await
                .map_err(DatabaseError::Query)?;

                match occupant {
                    Some(existing_id) => Err(StoreError::Conflict { existing_id }),
                    None => Err(StoreError::Contention {
                        desk_id: changes.desk_id.unwrap_or_default(),
                    }),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn cancel(
        &self,
        id: Uuid,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let sql = format!(
            "UPDATE bookings SET \
                 status = 'cancelled', \
                 cancelled_at = $2, \
                 cancellation_reason = COALESCE($3, cancellation_reason) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(at)
            .bind(reason)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(booking_from_row).transpose()
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }
}
