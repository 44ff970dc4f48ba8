//! Helpers for reading settings from the process environment

use std::str::FromStr;

use tracing::warn;

/// Read `key` and parse it, falling back to `default` when unset or unparseable
pub fn var_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value for {key}, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Read `key` as a non-empty string
pub fn var_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
