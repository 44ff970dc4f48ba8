//! Persistence for the authentication service

use common::error::DatabaseError;
use thiserror::Error;

pub mod user;

pub use user::UserRepository;

/// Errors raised by the user repository
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("failed to hash password: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Type alias for repository results
pub type RepositoryResult<T> = Result<T, RepositoryError>;
