//! Authorization gate for the booking endpoints
//!
//! Every protected request goes through [`Authorizer::authorize`], which turns
//! the raw `Authorization` header into an [`Identity`]. The admin rules that
//! depend on the booking being touched live on [`Identity`] itself.

use async_trait::async_trait;
use common::revocation::RevocationList;
use common::token::{Claims, TokenType, bearer_token};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::error::{AuthError, BookingError};

/// The verified caller of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub is_admin: bool,
}

impl Identity {
    pub fn require_admin(&self) -> Result<(), AuthError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    /// Allow the owner of `user_id` or any admin
    pub fn require_self_or_admin(&self, user_id: &str) -> Result<(), AuthError> {
        if self.is_admin || self.user_id == user_id {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

/// What a verifier learned from a valid token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: String,
    pub is_admin: bool,
}

#[derive(Error, Debug)]
pub enum VerifyError {
    /// The token itself is unacceptable
    #[error("token rejected: {0}")]
    Rejected(String),

    /// The verifier could not reach a dependency
    #[error("token verifier unavailable: {0}")]
    Unavailable(String),
}

/// Checks a bearer token and yields the caller it belongs to
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, VerifyError>;
}

/// RS256 access-token verifier with an optional revocation check
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    revocations: Option<RevocationList>,
}

impl JwtVerifier {
    pub fn new(
        public_key_pem: &str,
        revocations: Option<RevocationList>,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;

        Ok(Self {
            decoding_key,
            validation,
            revocations,
        })
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken, VerifyError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| VerifyError::Rejected(e.to_string()))?
            .claims;

        if claims.token_type != TokenType::Access {
            return Err(VerifyError::Rejected("not an access token".to_string()));
        }
        if claims.sub.trim().is_empty() {
            return Err(VerifyError::Rejected("empty subject".to_string()));
        }

        if let Some(revocations) = &self.revocations {
            let revoked = revocations
                .is_revoked(token)
                .await
                .map_err(|e| VerifyError::Unavailable(e.to_string()))?;
            if revoked {
                return Err(VerifyError::Rejected("token revoked".to_string()));
            }
        }

        Ok(VerifiedToken {
            user_id: claims.sub,
            is_admin: claims.admin,
        })
    }
}

/// Turns request headers into an [`Identity`]
#[derive(Clone)]
pub struct Authorizer {
    verifier: Arc<dyn TokenVerifier>,
}

impl Authorizer {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Resolve the caller from an `Authorization` header value
    pub async fn authorize(&self, header: Option<&str>) -> Result<Identity, BookingError> {
        let token = header
            .and_then(bearer_token)
            .ok_or(AuthError::MissingToken)?;

        match self.verifier.verify(token).await {
            Ok(verified) => Ok(Identity {
                user_id: verified.user_id,
                is_admin: verified.is_admin,
            }),
            Err(VerifyError::Rejected(reason)) => {
                debug!("Rejected bearer token: {}", reason);
                Err(AuthError::InvalidToken.into())
            }
            Err(VerifyError::Unavailable(reason)) => {
                error!("Token verification failed: {}", reason);
                Err(BookingError::Internal(reason))
            }
        }
    }
}
