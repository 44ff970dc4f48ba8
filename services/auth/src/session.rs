//! Session management using Redis
//!
//! A user has at most one live session: the refresh token issued last. A
//! refresh token that is valid but no longer the stored one has been
//! superseded and is refused.

use common::cache::RedisPool;
use common::error::CacheResult;
use tracing::info;
use uuid::Uuid;

/// Session manager for handling user sessions in Redis
#[derive(Clone)]
pub struct SessionManager {
    redis_pool: RedisPool,
    ttl_seconds: u64,
}

impl SessionManager {
    /// Create a new session manager; sessions live as long as a refresh token
    pub fn new(redis_pool: RedisPool, ttl_seconds: u64) -> Self {
        Self {
            redis_pool,
            ttl_seconds,
        }
    }

    /// Store `refresh_token` as the user's session, replacing any earlier one
    pub async fn create_session(&self, user_id: Uuid, refresh_token: &str) -> CacheResult<()> {
        info!("Creating session for user: {}", user_id);
        self.redis_pool
            .set(&session_key(user_id), refresh_token, Some(self.ttl_seconds))
            .await
    }

    /// Delete a session for a user
    pub async fn delete_session(&self, user_id: Uuid) -> CacheResult<()> {
        info!("Deleting session for user: {}", user_id);
        self.redis_pool.delete(&session_key(user_id)).await?;
        Ok(())
    }

    /// Whether `refresh_token` is the user's current session
    pub async fn is_session_valid(&self, user_id: Uuid, refresh_token: &str) -> CacheResult<bool> {
        let stored = self.redis_pool.get(&session_key(user_id)).await?;
        Ok(stored.as_deref() == Some(refresh_token))
    }

    /// Get Redis health status
    pub async fn health_check(&self) -> CacheResult<bool> {
        self.redis_pool.health_check().await
    }
}

fn session_key(user_id: Uuid) -> String {
    format!("session:{}", user_id)
}
