//! Booking operations: validation, the double-booking check, lifecycle changes
//!
//! Creating a booking runs a day-window query for active bookings on the same
//! desk and reports the oldest one as the conflict. The store's guarded insert
//! then closes the window between that check and the write.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Identity;
use crate::calendar::BookingCalendar;
use crate::error::{BookingError, BookingResult};
use crate::models::{
    Booking, BookingChanges, CreateBookingRequest, DateInput, NewBooking, UpdateBookingRequest,
};
use crate::repositories::{BookingStore, InsertOutcome};

/// Booking service shared across handlers
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    calendar: BookingCalendar,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>, calendar: BookingCalendar) -> Self {
        Self { store, calendar }
    }

    pub fn calendar(&self) -> &BookingCalendar {
        &self.calendar
    }

    /// Create an active booking unless the desk is already taken that day
    pub async fn create_booking(&self, request: CreateBookingRequest) -> BookingResult<Booking> {
        let name = required("name", request.name)?;
        let user_id = required("userId", request.user_id)?;
        let desk_id = required("deskId", request.desk_id)?;
        let date = request
            .date_timestamp
            .filter(|date| !date.is_blank())
            .ok_or_else(|| missing("dateTimestamp"))?;
        let date_timestamp = self
            .calendar
            .parse_date(&date)
            .ok_or_else(invalid_date)?;

        let window = self
            .calendar
            .day_window(date_timestamp)
            .ok_or_else(invalid_date)?;
        let date_key = self.calendar.date_key(date_timestamp);

        let existing = self.store.find_active_in_window(&desk_id, &window).await?;
        if let Some(first) = existing.first() {
            warn!(desk_id = %desk_id, day = %date_key, existing_id = %first.id, "Desk already booked");
            return Err(BookingError::Conflict {
                existing_id: first.id,
            });
        }

        let outcome = self
            .store
            .insert_if_vacant(NewBooking {
                name,
                user_id,
                desk_id,
                date_timestamp,
                date_key,
                created_at: Utc::now(),
            })
            .await?;

        match outcome {
            InsertOutcome::Inserted(booking) => {
                info!(
                    booking_id = %booking.id,
                    desk_id = %booking.desk_id,
                    day = %booking.date_key,
                    "Booking created"
                );
                Ok(booking)
            }
            InsertOutcome::Occupied { existing_id } => {
                warn!(day = %date_key, existing_id = %existing_id, "Desk taken by a concurrent booking");
                Err(BookingError::Conflict { existing_id })
            }
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> BookingResult<Booking> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Bookings under a display name; matching nothing is an error
    pub async fn get_by_name(&self, name: &str) -> BookingResult<Vec<Booking>> {
        let bookings = self.store.find_by_name(name.trim()).await?;
        if bookings.is_empty() {
            return Err(BookingError::NotFound(format!(
                "no bookings found for name {}",
                name.trim()
            )));
        }
        Ok(bookings)
    }

    /// Bookings on the day `date` falls on; may be empty
    pub async fn get_by_date(&self, date: &str) -> BookingResult<Vec<Booking>> {
        let instant = self
            .calendar
            .parse_date(&DateInput::from(date))
            .ok_or_else(invalid_date)?;
        let window = self.calendar.day_window(instant).ok_or_else(invalid_date)?;
        Ok(self.store.find_in_window(&window).await?)
    }

    /// Bookings made for a user; may be empty
    pub async fn get_by_user(&self, user_id: &str) -> BookingResult<Vec<Booking>> {
        Ok(self.store.find_by_user(user_id).await?)
    }

    pub async fn get_all(&self) -> BookingResult<Vec<Booking>> {
        Ok(self.store.find_all().await?)
    }

    /// Overwrite the supplied fields, recording the previous document
    pub async fn update_booking(
        &self,
        id: Uuid,
        request: UpdateBookingRequest,
    ) -> BookingResult<Booking> {
        if request.is_empty() {
            return Err(BookingError::Validation(
                "no updatable fields supplied".to_string(),
            ));
        }
        let name = not_blank("name", request.name)?;
        let user_id = not_blank("userId", request.user_id)?;
        let desk_id = not_blank("deskId", request.desk_id)?;
        let date = match request.date_timestamp {
            Some(input) => {
                let instant = self.calendar.parse_date(&input).ok_or_else(invalid_date)?;
                self.calendar.day_window(instant).ok_or_else(invalid_date)?;
                Some((instant, self.calendar.date_key(instant)))
            }
            None => None,
        };

        let current = self.get_by_id(id).await?;
        let snapshot = current
            .snapshot()
            .map_err(|e| BookingError::Internal(format!("failed to snapshot booking: {e}")))?;

        let target_desk = desk_id.as_deref().unwrap_or(&current.desk_id);
        let target_day = date.map_or(current.date_key, |(_, key)| key);
        let moved = target_desk != current.desk_id || target_day != current.date_key;
        if current.is_active() && moved {
            let window = self
                .calendar
                .window_for_day(target_day)
                .ok_or_else(invalid_date)?;
            let clashes = self.store.find_active_in_window(target_desk, &window).await?;
            if let Some(first) = clashes.iter().find(|b| b.id != id) {
                warn!(booking_id = %id, existing_id = %first.id, "Update would double-book desk");
                return Err(BookingError::Conflict {
                    existing_id: first.id,
                });
            }
        }

        let changes = BookingChanges {
            name,
            user_id,
            desk_id,
            date,
            snapshot,
        };
        let updated = self
            .store
            .update(id, changes)
            .await?
            .ok_or_else(|| not_found(id))?;

        info!(booking_id = %id, "Booking updated");
        Ok(updated)
    }

    /// Mark a booking cancelled; cancelling twice re-stamps `cancelledAt`
    pub async fn cancel_booking(&self, id: Uuid, reason: Option<String>) -> BookingResult<Booking> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let cancelled = self
            .store
            .cancel(id, reason, Utc::now())
            .await?
            .ok_or_else(|| not_found(id))?;

        info!(booking_id = %id, "Booking cancelled");
        Ok(cancelled)
    }

    /// Hard delete, admins only
    pub async fn delete_booking(&self, id: Uuid, caller: &Identity) -> BookingResult<()> {
        caller.require_admin()?;

        if !self.store.delete(id).await? {
            return Err(not_found(id));
        }

        info!(booking_id = %id, admin = %caller.user_id, "Booking deleted");
        Ok(())
    }
}

fn missing(field: &str) -> BookingError {
    BookingError::Validation(format!("missing field: {field}"))
}

fn invalid_date() -> BookingError {
    BookingError::Validation("invalid date".to_string())
}

fn not_found(id: Uuid) -> BookingError {
    BookingError::NotFound(format!("booking {id} not found"))
}

fn required(field: &str, value: Option<String>) -> BookingResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing(field))
}

fn not_blank(field: &str, value: Option<String>) -> BookingResult<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => Err(BookingError::Validation(format!(
            "field must not be blank: {field}"
        ))),
        Some(v) => Ok(Some(v.trim().to_string())),
        None => Ok(None),
    }
}
