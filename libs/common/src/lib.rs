//! Common library for the desk booking services
//!
//! This crate provides the plumbing shared by the `auth` and `bookings`
//! services: PostgreSQL pooling, the Redis client and token revocation list,
//! bearer token claims, and the infrastructure error types.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, init_pool, health_check};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     assert!(health_check(&pool).await);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod database;
pub mod env;
pub mod error;
pub mod revocation;
pub mod token;
