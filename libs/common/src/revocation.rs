//! Revoked-token list kept in Redis
//!
//! Tokens are stored under `revoked_token:<token>` with a TTL equal to their
//! remaining lifetime, so entries disappear once the token would have expired
//! anyway.

use crate::cache::RedisPool;
use crate::error::CacheResult;

const KEY_PREFIX: &str = "revoked_token:";

/// Revocation list backed by Redis
#[derive(Clone)]
pub struct RevocationList {
    redis: RedisPool,
}

impl RevocationList {
    pub fn new(redis: RedisPool) -> Self {
        Self { redis }
    }

    /// Revoke `token` for `ttl_seconds`; a zero TTL is a no-op
    pub async fn revoke(&self, token: &str, ttl_seconds: u64) -> CacheResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }
        self.redis.set(&key(token), "1", Some(ttl_seconds)).await
    }

    /// Whether `token` has been revoked
    pub async fn is_revoked(&self, token: &str) -> CacheResult<bool> {
        Ok(self.redis.get(&key(token)).await?.is_some())
    }
}

fn key(token: &str) -> String {
    format!("{KEY_PREFIX}{token}")
}
