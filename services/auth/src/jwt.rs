//! JWT service for token generation, validation, and management
//!
//! Tokens are signed with RS256. Access tokens carry the `admin` claim read
//! by the bookings service; refresh tokens are rotated on every use and the
//! old one goes on the shared revocation list.

use anyhow::{Context, Result};
use common::env::var_or;
use common::revocation::RevocationList;
use common::token::{Claims, TokenType, read_key_material};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use uuid::Uuid;

use crate::models::User;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Private key for signing tokens
    pub private_key: String,
    /// Public key for verifying tokens
    pub public_key: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PRIVATE_KEY`: Private key for signing tokens (PEM format) or path to private key file
    /// - `JWT_PUBLIC_KEY`: Public key for verifying tokens (PEM format) or path to public key file
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    pub fn from_env() -> Result<Self> {
        let private_key = std::env::var("JWT_PRIVATE_KEY")
            .context("JWT_PRIVATE_KEY environment variable not set")?;
        let private_key =
            read_key_material(&private_key).context("Failed to read private key file")?;

        let public_key = std::env::var("JWT_PUBLIC_KEY")
            .context("JWT_PUBLIC_KEY environment variable not set")?;
        let public_key = read_key_material(&public_key).context("Failed to read public key file")?;

        Ok(JwtConfig {
            private_key,
            public_key,
            access_token_expiry: var_or("JWT_ACCESS_TOKEN_EXPIRY", 900),
            refresh_token_expiry: var_or("JWT_REFRESH_TOKEN_EXPIRY", 604800),
        })
    }
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())
            .context("invalid JWT private key")?;
        let decoding_key = DecodingKey::from_rsa_pem(config.public_key.as_bytes())
            .context("invalid JWT public key")?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;

        Ok(JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    fn sign(&self, user: &User, token_type: TokenType, lifetime: u64) -> Result<String> {
        let now = now()?;
        let claims = Claims {
            sub: user.id.to_string(),
            admin: token_type == TokenType::Access && user.is_admin,
            iat: now,
            exp: now + lifetime,
            token_type,
            jti: Uuid::new_v4().to_string(),
        };

        Ok(encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user: &User) -> Result<String> {
        self.sign(user, TokenType::Access, self.config.access_token_expiry)
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user: &User) -> Result<String> {
        self.sign(user, TokenType::Refresh, self.config.refresh_token_expiry)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }

    /// Put a token on the revocation list for the rest of its lifetime
    pub async fn revoke(&self, revocations: &RevocationList, token: &str, claims: &Claims) -> Result<()> {
        let remaining = claims.exp.saturating_sub(now()?);
        revocations.revoke(token, remaining).await?;
        Ok(())
    }

    /// Rotate a refresh token
    ///
    /// The old token is revoked and a new one is issued for the same user.
    pub async fn rotate_refresh_token(
        &self,
        revocations: &RevocationList,
        user: &User,
        old_refresh_token: &str,
    ) -> Result<String> {
        let claims = self.validate_token(old_refresh_token)?;

        if claims.token_type != TokenType::Refresh {
            anyhow::bail!("Token is not a refresh token");
        }
        if claims.sub != user.id.to_string() {
            anyhow::bail!("Token does not belong to user");
        }

        self.revoke(revocations, old_refresh_token, &claims).await?;
        info!("Rotated refresh token for user: {}", user.id);

        self.generate_refresh_token(user)
    }
}

fn now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("Failed to get current time")?
        .as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serial_test::serial;

    const PRIVATE_KEY: &str = include_str!("../tests/fixtures/jwt_private.pem");
    const PUBLIC_KEY: &str = include_str!("../tests/fixtures/jwt_public.pem");

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            private_key: PRIVATE_KEY.to_string(),
            public_key: PUBLIC_KEY.to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
        })
        .unwrap()
    }

    fn user(is_admin: bool) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            display_name: "Ada".to_string(),
            password_hash: String::new(),
            is_admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_access_token_carries_admin_claim() {
        let jwt = service();
        let admin = user(true);

        let claims = jwt
            .validate_token(&jwt.generate_access_token(&admin).unwrap())
            .unwrap();

        assert_eq!(claims.sub, admin.id.to_string());
        assert!(claims.admin);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 900);

        let plain = jwt
            .validate_token(&jwt.generate_access_token(&user(false)).unwrap())
            .unwrap();
        assert!(!plain.admin);
    }

    #[test]
    fn test_refresh_token_never_carries_admin_claim() {
        let jwt = service();

        let claims = jwt
            .validate_token(&jwt.generate_refresh_token(&user(true)).unwrap())
            .unwrap();

        assert_eq!(claims.token_type, TokenType::Refresh);
        assert!(!claims.admin);
        assert_eq!(claims.exp - claims.iat, 604800);
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let jwt = service();
        let token = jwt.generate_access_token(&user(false)).unwrap();

        let mut tampered = token.clone();
        tampered.push('x');

        assert!(jwt.validate_token(&tampered).is_err());
        assert!(jwt.validate_token("not.a.token").is_err());
    }

    #[test]
    fn test_tokens_issued_together_differ() {
        let jwt = service();
        let ada = user(false);

        let first = jwt.generate_refresh_token(&ada).unwrap();
        let second = jwt.generate_refresh_token(&ada).unwrap();
        assert_ne!(first, second);

        let first = jwt.validate_token(&first).unwrap();
        let second = jwt.validate_token(&second).unwrap();
        assert_eq!(first.sub, second.sub);
        assert_ne!(first.jti, second.jti);

        assert_ne!(
            jwt.generate_access_token(&ada).unwrap(),
            jwt.generate_access_token(&ada).unwrap()
        );
    }

    #[tokio::test]
    #[ignore = "requires running Redis"]
    async fn test_rotated_refresh_token_is_live() {
        use common::cache::{RedisConfig, RedisPool};

        let jwt = service();
        let ada = user(false);
        let revocations = RevocationList::new(RedisPool::new(&RedisConfig::from_env()).unwrap());

        let old = jwt.generate_refresh_token(&ada).unwrap();
        let new = jwt
            .rotate_refresh_token(&revocations, &ada, &old)
            .await
            .unwrap();

        assert_ne!(old, new);
        assert!(revocations.is_revoked(&old).await.unwrap());
        assert!(!revocations.is_revoked(&new).await.unwrap());
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        unsafe {
            std::env::set_var("JWT_PRIVATE_KEY", PRIVATE_KEY);
            std::env::set_var("JWT_PUBLIC_KEY", PUBLIC_KEY);
            std::env::set_var("JWT_ACCESS_TOKEN_EXPIRY", "60");
            std::env::remove_var("JWT_REFRESH_TOKEN_EXPIRY");
        }

        let config = JwtConfig::from_env().unwrap();

        unsafe {
            std::env::remove_var("JWT_PRIVATE_KEY");
            std::env::remove_var("JWT_PUBLIC_KEY");
            std::env::remove_var("JWT_ACCESS_TOKEN_EXPIRY");
        }

        assert_eq!(config.access_token_expiry, 60);
        assert_eq!(config.refresh_token_expiry, 604800);
        assert!(JwtService::new(config).is_ok());
        assert!(JwtConfig::from_env().is_err());
    }
}
