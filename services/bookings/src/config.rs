//! Service configuration
//!
//! `BOOKING_*` variables are read through the `config` crate; JWT key
//! material is shared with the auth service and read separately.

use anyhow::{Context, Result};
use common::token::read_key_material;
use config::{Config, Environment};
use serde::Deserialize;

use crate::calendar::BookingCalendar;

/// Which [`BookingStore`](crate::repositories::BookingStore) backs the service
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BookingConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Offset of the booking timezone from UTC, in minutes
    ///
    /// Stored bookings keep the `date_key` computed under the offset they were
    /// written with, and the Postgres guard index is built on that key. After
    /// changing this value, day queries use the new boundaries while existing
    /// rows keep the old key, so recompute `date_key` before serving traffic.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub store: StoreKind,
}

fn default_port() -> u16 {
    3001
}

impl BookingConfig {
    /// Load from `BOOKING_PORT`, `BOOKING_UTC_OFFSET_MINUTES` and `BOOKING_STORE`
    pub fn from_env() -> Result<Self> {
        Config::builder()
            .add_source(Environment::with_prefix("BOOKING").try_parsing(true))
            .build()
            .context("failed to read BOOKING_* configuration")?
            .try_deserialize()
            .context("invalid BOOKING_* configuration")
    }

    pub fn calendar(&self) -> Result<BookingCalendar> {
        BookingCalendar::from_offset_minutes(self.utc_offset_minutes).with_context(|| {
            format!(
                "BOOKING_UTC_OFFSET_MINUTES out of range: {}",
                self.utc_offset_minutes
            )
        })
    }
}

/// Public half of the token signing key
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub public_key: String,
}

impl JwtConfig {
    /// Load `JWT_PUBLIC_KEY`, either inline PEM or a path to a PEM file
    pub fn from_env() -> Result<Self> {
        let value = std::env::var("JWT_PUBLIC_KEY")
            .context("JWT_PUBLIC_KEY environment variable not set")?;
        let public_key =
            read_key_material(&value).context("failed to read JWT public key file")?;

        Ok(Self { public_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        unsafe {
            std::env::remove_var("BOOKING_PORT");
            std::env::remove_var("BOOKING_UTC_OFFSET_MINUTES");
            std::env::remove_var("BOOKING_STORE");
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();

        let config = BookingConfig::from_env().unwrap();

        assert_eq!(
            config,
            BookingConfig {
                port: 3001,
                utc_offset_minutes: 0,
                store: StoreKind::Postgres,
            }
        );
        assert_eq!(config.calendar().unwrap(), BookingCalendar::utc());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear();
        unsafe {
            std::env::set_var("BOOKING_PORT", "8088");
            std::env::set_var("BOOKING_UTC_OFFSET_MINUTES", "-300");
            std::env::set_var("BOOKING_STORE", "memory");
        }

        let config = BookingConfig::from_env().unwrap();
        clear();

        assert_eq!(config.port, 8088);
        assert_eq!(config.utc_offset_minutes, -300);
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.calendar().unwrap().offset().local_minus_utc(), -300 * 60);
    }

    #[test]
    #[serial]
    fn test_out_of_range_offset() {
        clear();
        unsafe {
            std::env::set_var("BOOKING_UTC_OFFSET_MINUTES", "2000");
        }

        let config = BookingConfig::from_env().unwrap();
        clear();

        assert!(config.calendar().is_err());
    }

    #[test]
    #[serial]
    fn test_unknown_store_kind() {
        clear();
        unsafe {
            std::env::set_var("BOOKING_STORE", "mongodb");
        }

        let result = BookingConfig::from_env();
        clear();

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_inline_public_key() {
        let pem = include_str!("../tests/fixtures/jwt_public.pem");
        unsafe {
            std::env::set_var("JWT_PUBLIC_KEY", pem);
        }

        let config = JwtConfig::from_env().unwrap();
        unsafe {
            std::env::remove_var("JWT_PUBLIC_KEY");
        }

        assert_eq!(config.public_key, pem);
        assert!(JwtConfig::from_env().is_err());
    }
}
