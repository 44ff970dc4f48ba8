//! In-process booking store
//!
//! Used for local development (`BOOKING_STORE=memory`) and tests. All guarded
//! writes run under one mutex, which makes check-and-insert atomic.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BookingStore, InsertOutcome, StoreError, StoreResult};
use crate::calendar::DayWindow;
use crate::models::{Booking, BookingChanges, BookingStatus, NewBooking};

#[derive(Debug, Default)]
struct Inner {
    bookings: Vec<Booking>,
    writes: u64,
}

impl Inner {
    fn occupant(&self, desk_id: &str, date_key: NaiveDate, except: Option<Uuid>) -> Option<&Booking> {
        self.bookings
            .iter()
            .filter(|b| b.is_active() && b.desk_id == desk_id && b.date_key == date_key)
            .filter(|b| Some(b.id) != except)
            .min_by_key(|b| b.created_at)
    }

    fn select(&self, predicate: impl Fn(&Booking) -> bool) -> Vec<Booking> {
        let mut found: Vec<Booking> = self.bookings.iter().filter(|b| predicate(b)).cloned().collect();
        found.sort_by_key(|b| (b.date_timestamp, b.created_at));
        found
    }
}

/// Booking store holding everything in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookingStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful mutating calls so far
    pub async fn write_count(&self) -> u64 {
        self.inner.lock().await.writes
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn find_active_in_window(
        &self,
        desk_id: &str,
        window: &DayWindow,
    ) -> StoreResult<Vec<Booking>> {
        let inner = self.inner.lock().await;
        let mut found = inner.select(|b| {
            b.is_active() && b.desk_id == desk_id && window.contains(b.date_timestamp)
        });
        found.sort_by_key(|b| b.created_at);
        Ok(found)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let inner = self.inner.lock().await;
        Ok(inner.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Vec<Booking>> {
        Ok(self.inner.lock().await.select(|b| b.name == name))
    }

    async fn find_by_user(&self, user_id: &str) -> StoreResult<Vec<Booking>> {
        Ok(self.inner.lock().await.select(|b| b.user_id == user_id))
    }

    async fn find_in_window(&self, window: &DayWindow) -> StoreResult<Vec<Booking>> {
        Ok(self
            .inner
            .lock()
            .await
            .select(|b| window.contains(b.date_timestamp)))
    }

    async fn find_all(&self) -> StoreResult<Vec<Booking>> {
        Ok(self.inner.lock().await.select(|_| true))
    }

    async fn insert_if_vacant(&self, booking: NewBooking) -> StoreResult<InsertOutcome> {
        let mut inner = self.inner.lock().await;

        if let Some(existing) = inner.occupant(&booking.desk_id, booking.date_key, None) {
            return Ok(InsertOutcome::Occupied {
                existing_id: existing.id,
            });
        }

        let stored = Booking {
            id: Uuid::new_v4(),
            name: booking.name,
            user_id: booking.user_id,
            desk_id: booking.desk_id,
            date_timestamp: booking.date_timestamp,
            status: BookingStatus::Active,
            created_at: booking.created_at,
            cancelled_at: None,
            cancellation_reason: None,
            old_modifications: Vec::new(),
            date_key: booking.date_key,
        };
        inner.bookings.push(stored.clone());
        inner.writes += 1;

        Ok(InsertOutcome::Inserted(stored))
    }

    async fn update(&self, id: Uuid, changes: BookingChanges) -> StoreResult<Option<Booking>> {
        let mut inner = self.inner.lock().await;

        let Some(current) = inner.bookings.iter().find(|b| b.id == id) else {
            return Ok(None);
        };

        if current.is_active() {
            let desk_id = changes.desk_id.as_deref().unwrap_or(&current.desk_id);
            let date_key = changes.date.map_or(current.date_key, |(_, key)| key);
            if let Some(occupant) = inner.occupant(desk_id, date_key, Some(id)) {
                return Err(StoreError::Conflict {
                    existing_id: occupant.id,
                });
            }
        }

        let Some(booking) = inner.bookings.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            booking.name = name;
        }
        if let Some(user_id) = changes.user_id {
            booking.user_id = user_id;
        }
        if let Some(desk_id) = changes.desk_id {
            booking.desk_id = desk_id;
        }
        if let Some((date_timestamp, date_key)) = changes.date {
            booking.date_timestamp = date_timestamp;
            booking.date_key = date_key;
        }
        booking.old_modifications.push(changes.snapshot);
        let updated = booking.clone();
        inner.writes += 1;

        Ok(Some(updated))
    }

    async fn cancel(
        &self,
        id: Uuid,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let mut inner = self.inner.lock().await;

        let Some(booking) = inner.bookings.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(at);
        if reason.is_some() {
            booking.cancellation_reason = reason;
        }
        let cancelled = booking.clone();
        inner.writes += 1;

        Ok(Some(cancelled))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;

        let before = inner.bookings.len();
        inner.bookings.retain(|b| b.id != id);
        let removed = inner.bookings.len() < before;
        if removed {
            inner.writes += 1;
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn new_booking(desk: &str, day: u32) -> NewBooking {
        NewBooking {
            name: "Ada".to_string(),
            user_id: "user-1".to_string(),
            desk_id: desk.to_string(),
            date_timestamp: Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap(),
            date_key: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            created_at: Utc::now(),
        }
    }

    fn inserted(outcome: InsertOutcome) -> Booking {
        match outcome {
            InsertOutcome::Inserted(booking) => booking,
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_guard_blocks_second_active_booking() {
        let store = InMemoryBookingStore::new();

        let first = inserted(store.insert_if_vacant(new_booking("D1", 4)).await.unwrap());
        let second = store.insert_if_vacant(new_booking("D1", 4)).await.unwrap();

        assert_eq!(second, InsertOutcome::Occupied { existing_id: first.id });
        assert_eq!(store.write_count().await, 1);

        // another desk or another day is free
        inserted(store.insert_if_vacant(new_booking("D2", 4)).await.unwrap());
        inserted(store.insert_if_vacant(new_booking("D1", 5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_booking_frees_the_desk() {
        let store = InMemoryBookingStore::new();
        let first = inserted(store.insert_if_vacant(new_booking("D1", 4)).await.unwrap());

        store.cancel(first.id, None, Utc::now()).await.unwrap();

        inserted(store.insert_if_vacant(new_booking("D1", 4)).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_keeps_previous_reason_when_none_given() {
        let store = InMemoryBookingStore::new();
        let booking = inserted(store.insert_if_vacant(new_booking("D1", 4)).await.unwrap());

        store
            .cancel(booking.id, Some("sick".to_string()), Utc::now())
            .await
            .unwrap();
        let again = store.cancel(booking.id, None, Utc::now()).await.unwrap().unwrap();

        assert_eq!(again.status, BookingStatus::Cancelled);
        assert_eq!(again.cancellation_reason.as_deref(), Some("sick"));
    }

    #[tokio::test]
    async fn test_update_rejects_move_onto_occupied_desk() {
        let store = InMemoryBookingStore::new();
        let occupant = inserted(store.insert_if_vacant(new_booking("D1", 4)).await.unwrap());
        let mover = inserted(store.insert_if_vacant(new_booking("D2", 4)).await.unwrap());

        let result = store
            .update(
                mover.id,
                BookingChanges {
                    name: None,
                    user_id: None,
                    desk_id: Some("D1".to_string()),
                    date: None,
                    snapshot: json!({}),
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(StoreError::Conflict { existing_id }) if existing_id == occupant.id
        ));
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let store = InMemoryBookingStore::new();
        let id = Uuid::new_v4();

        assert!(store.find_by_id(id).await.unwrap().is_none());
        assert!(store.cancel(id, None, Utc::now()).await.unwrap().is_none());
        assert!(!store.delete(id).await.unwrap());
        assert_eq!(store.write_count().await, 0);
    }
}
