//! Desk booking service
//!
//! The core is [`service::BookingService`], which enforces one active booking
//! per desk per day, and [`auth::Authorizer`], which turns bearer tokens into
//! an [`auth::Identity`]. [`http::create_router`] exposes both over axum.

pub mod auth;
pub mod calendar;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod repositories;
pub mod service;
pub mod state;

pub use state::AppState;
