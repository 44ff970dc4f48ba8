//! Persistence seam for bookings
//!
//! The core only talks to [`BookingStore`]. Every implementation must make
//! [`BookingStore::insert_if_vacant`] and [`BookingStore::update`] atomic with
//! respect to the one-active-booking-per-desk-per-day guard, keyed on
//! `(desk_id, date_key)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseError;
use thiserror::Error;
use uuid::Uuid;

use crate::calendar::DayWindow;
use crate::models::{Booking, BookingChanges, NewBooking};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryBookingStore;
pub use postgres::PgBookingStore;

/// Errors raised by a booking store
#[derive(Error, Debug)]
pub enum StoreError {
    /// A write would have produced a second active booking for a desk and day
    #[error("desk already booked for this day (existing booking {existing_id})")]
    Conflict { existing_id: Uuid },

    /// The guard rejected a write but the occupant vanished before it could be named
    #[error("concurrent modification of desk {desk_id}")]
    Contention { desk_id: String },

    /// A stored row could not be decoded
    #[error("corrupt booking row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Type alias for store results
pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a guarded insert
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Booking),
    /// An active booking already holds the desk for that day
    Occupied { existing_id: Uuid },
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Active bookings for a desk within a day window, oldest first
    async fn find_active_in_window(
        &self,
        desk_id: &str,
        window: &DayWindow,
    ) -> StoreResult<Vec<Booking>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    async fn find_by_name(&self, name: &str) -> StoreResult<Vec<Booking>>;

    async fn find_by_user(&self, user_id: &str) -> StoreResult<Vec<Booking>>;

    /// Bookings of any status dated within a window
    async fn find_in_window(&self, window: &DayWindow) -> StoreResult<Vec<Booking>>;

    async fn find_all(&self) -> StoreResult<Vec<Booking>>;

    /// Insert an active booking unless its desk and day are already taken
    async fn insert_if_vacant(&self, booking: NewBooking) -> StoreResult<InsertOutcome>;

    /// Overwrite the supplied fields and append the audit snapshot
    ///
    /// Returns `Ok(None)` when the id does not exist and
    /// [`StoreError::Conflict`] when an active booking would collide.
    async fn update(&self, id: Uuid, changes: BookingChanges) -> StoreResult<Option<Booking>>;

    /// Mark a booking cancelled, keeping any earlier reason when none is given
    async fn cancel(
        &self,
        id: Uuid,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>>;

    /// Hard delete; `false` when the id does not exist
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}
