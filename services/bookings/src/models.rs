//! API models for request and response payloads

pub mod booking;

pub use booking::{
    Booking, BookingChanges, BookingStatus, CancelBookingRequest, CreateBookingRequest,
    DateInput, NewBooking, UpdateBookingRequest,
};
