//! Authentication service models

pub mod token;
pub mod user;

// Re-export for convenience
pub use token::{LoginRequest, RefreshTokenRequest, TokenResponse};
pub use user::{CreateUserRequest, NewUser, User};
