//! User repository for database operations

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use common::error::DatabaseError;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::{RepositoryError, RepositoryResult};
use crate::models::{NewUser, User};

const UNIQUE_VIOLATION: &str = "23505";

const COLUMNS: &str = "id, email, display_name, password_hash, is_admin, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))
    }

    /// Create a new user, hashing its password
    pub async fn create(&self, new_user: &NewUser) -> RepositoryResult<User> {
        info!("Creating new user: {}", new_user.email);

        let password_hash = hash_password(&new_user.password)?;

        let sql = format!(
            "INSERT INTO users (id, email, display_name, password_hash, is_admin) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(new_user.email.to_lowercase())
            .bind(&new_user.display_name)
            .bind(&password_hash)
            .bind(new_user.is_admin)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)
            .map_err(|e| {
                if e.sqlstate().as_deref() == Some(UNIQUE_VIOLATION) {
                    RepositoryError::DuplicateEmail
                } else {
                    e.into()
                }
            })?;

        Ok(user_from_row(&row))
    }

    /// Find a user by email, case-insensitively
    pub async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// All users, oldest first
    pub async fn list(&self) -> RepositoryResult<Vec<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users ORDER BY created_at");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Grant the admin flag; granting it twice is harmless
    pub async fn set_admin(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        info!("Granting admin to user: {}", id);

        let sql = format!(
            "UPDATE users SET is_admin = TRUE, updated_at = NOW() WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(row.as_ref().map(user_from_row))
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        password_hash: row.get("password_hash"),
        is_admin: row.get("is_admin"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Hash a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> RepositoryResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| RepositoryError::PasswordHash(e.to_string()))
}

/// Check a password against a stored hash; an unparseable hash never matches
pub fn verify_password(user: &User, password: &str) -> bool {
    PasswordHash::new(&user.password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user_with_hash(password_hash: String) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            display_name: "Ada".to_string(),
            password_hash,
            is_admin: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("Correct#Horse1").unwrap();
        assert!(hash.starts_with("$argon2"));

        let user = user_with_hash(hash);
        assert!(verify_password(&user, "Correct#Horse1"));
        assert!(!verify_password(&user, "correct#horse1"));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(
            hash_password("Correct#Horse1").unwrap(),
            hash_password("Correct#Horse1").unwrap()
        );
    }

    #[test]
    fn test_garbage_hash_never_matches() {
        let user = user_with_hash("not-a-hash".to_string());
        assert!(!verify_password(&user, "anything"));
    }
}
