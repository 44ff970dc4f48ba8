//! Rate limiter for preventing brute force attacks on login

use common::env::var_or;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,        // 5 minutes
            ban_duration_seconds: 3600, // 1 hour
        }
    }
}

impl RateLimiterConfig {
    /// Read `AUTH_LOGIN_MAX_ATTEMPTS`, `AUTH_LOGIN_WINDOW_SECONDS` and `AUTH_LOGIN_BAN_SECONDS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: var_or("AUTH_LOGIN_MAX_ATTEMPTS", defaults.max_attempts),
            window_seconds: var_or("AUTH_LOGIN_WINDOW_SECONDS", defaults.window_seconds),
            ban_duration_seconds: var_or("AUTH_LOGIN_BAN_SECONDS", defaults.ban_duration_seconds),
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    attempts: u32,
    window_start: Instant,
    ban_expires: Option<Instant>,
}

/// Rate limiter keyed by an arbitrary string (the login email)
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record an attempt for `key` and report whether it may proceed
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);

        // entries past their window and ban would be reset anyway
        entries.retain(|_, entry| {
            entry.ban_expires.is_some_and(|ban| now < ban)
                || now.duration_since(entry.window_start) < window
        });

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            window_start: now,
            ban_expires: None,
        });

        if let Some(ban_expires) = entry.ban_expires {
            if now < ban_expires {
                return false;
            }
            entry.attempts = 0;
            entry.window_start = now;
            entry.ban_expires = None;
        }

        if now.duration_since(entry.window_start) >= window {
            entry.attempts = 0;
            entry.window_start = now;
        }

        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            info!(
                "Banned key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
            return false;
        }

        entry.attempts += 1;
        true
    }

    /// Forget the attempts recorded for `key`, e.g. after a successful login
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn limiter(max_attempts: u32, window_seconds: u64, ban_duration_seconds: u64) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_attempts,
            window_seconds,
            ban_duration_seconds,
        })
    }

    #[tokio::test]
    async fn test_blocks_after_max_attempts() {
        let limiter = limiter(3, 300, 3600);

        for _ in 0..3 {
            assert!(limiter.is_allowed("ada@example.com").await);
        }
        assert!(!limiter.is_allowed("ada@example.com").await);
        assert!(!limiter.is_allowed("ada@example.com").await);

        // other keys are unaffected
        assert!(limiter.is_allowed("grace@example.com").await);
    }

    #[tokio::test]
    async fn test_reset_clears_attempts() {
        let limiter = limiter(2, 300, 3600);

        assert!(limiter.is_allowed("ada@example.com").await);
        assert!(limiter.is_allowed("ada@example.com").await);
        limiter.reset("ada@example.com").await;

        assert!(limiter.is_allowed("ada@example.com").await);
    }

    #[tokio::test]
    async fn test_ban_expires() {
        let limiter = limiter(1, 300, 0);

        assert!(limiter.is_allowed("ada@example.com").await);
        assert!(!limiter.is_allowed("ada@example.com").await);

        // a zero-length ban is over on the next call
        assert!(limiter.is_allowed("ada@example.com").await);
    }

    #[tokio::test]
    async fn test_stale_entries_are_pruned() {
        let limiter = limiter(5, 0, 0);

        for n in 0..100 {
            assert!(limiter.is_allowed(&format!("user{n}@example.com")).await);
        }

        assert_eq!(limiter.entries.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_live_entries_survive_pruning() {
        let limiter = limiter(1, 300, 3600);

        assert!(limiter.is_allowed("ada@example.com").await);
        assert!(!limiter.is_allowed("ada@example.com").await);
        assert!(limiter.is_allowed("grace@example.com").await);

        // ada is still banned after another key was checked
        assert!(!limiter.is_allowed("ada@example.com").await);
        assert_eq!(limiter.entries.lock().await.len(), 2);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        unsafe {
            std::env::set_var("AUTH_LOGIN_MAX_ATTEMPTS", "10");
            std::env::remove_var("AUTH_LOGIN_WINDOW_SECONDS");
            std::env::remove_var("AUTH_LOGIN_BAN_SECONDS");
        }

        let config = RateLimiterConfig::from_env();
        unsafe {
            std::env::remove_var("AUTH_LOGIN_MAX_ATTEMPTS");
        }

        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.window_seconds, 300);
        assert_eq!(config.ban_duration_seconds, 3600);
    }
}
