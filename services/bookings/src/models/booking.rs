//! Booking models for the bookings service

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle of a booking; `Active` moves to `Cancelled` and never back
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Active,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "active",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(BookingStatus::Active),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// A desk reservation for one calendar day
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub name: String,
    pub user_id: String,
    pub desk_id: String,
    pub date_timestamp: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    /// One snapshot of the previous document per update, oldest first
    pub old_modifications: Vec<Value>,
    /// Calendar day of `date_timestamp` in the booking timezone
    #[serde(skip)]
    pub date_key: NaiveDate,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }

    /// The document as it would be serialized, minus its own audit trail
    pub fn snapshot(&self) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(fields) = value.as_object_mut() {
            fields.remove("oldModifications");
        }
        Ok(value)
    }
}

/// A validated booking ready to be persisted
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub name: String,
    pub user_id: String,
    pub desk_id: String,
    pub date_timestamp: DateTime<Utc>,
    pub date_key: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Field overwrites for an existing booking plus the audit snapshot to append
#[derive(Debug, Clone)]
pub struct BookingChanges {
    pub name: Option<String>,
    pub user_id: Option<String>,
    pub desk_id: Option<String>,
    pub date: Option<(DateTime<Utc>, NaiveDate)>,
    pub snapshot: Value,
}

/// A date as sent by clients: ISO text or epoch milliseconds
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DateInput {
    Millis(i64),
    Text(String),
}

impl DateInput {
    pub fn is_blank(&self) -> bool {
        matches!(self, DateInput::Text(text) if text.trim().is_empty())
    }
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        DateInput::Text(value.to_string())
    }
}

/// Request for booking creation
///
/// Every field is optional at the wire level so that a missing field is
/// reported as a validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub name: Option<String>,
    pub user_id: Option<String>,
    pub desk_id: Option<String>,
    pub date_timestamp: Option<DateInput>,
}

/// Request for a partial booking update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    pub name: Option<String>,
    pub user_id: Option<String>,
    pub desk_id: Option<String>,
    pub date_timestamp: Option<DateInput>,
}

impl UpdateBookingRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.user_id.is_none()
            && self.desk_id.is_none()
            && self.date_timestamp.is_none()
    }
}

/// Request for booking cancellation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}
