//! Bearer token claims shared by the issuer and the verifiers

use serde::{Deserialize, Serialize};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Admin custom claim; tokens without it are ordinary users
    #[serde(default)]
    pub admin: bool,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
    /// Unique token id; keeps tokens issued in the same second distinct
    #[serde(default)]
    pub jti: String,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Extract the token from an `Authorization: Bearer <token>` header value
///
/// Returns `None` when the scheme is not `Bearer` or the token is empty.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve key material that is either inline PEM or a path to a PEM file
pub fn read_key_material(value: &str) -> std::io::Result<String> {
    if value.trim_start().starts_with("-----BEGIN") {
        Ok(value.to_string())
    } else {
        Ok(std::fs::read_to_string(value)?.trim().to_string())
    }
}
