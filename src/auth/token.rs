//! JWT token generation and validation
//!
//! Two token kinds with distinct signing secrets: short-lived access tokens
//! carrying the identity's role, and long-lived refresh tokens carrying
//! identity only. A token of one kind never verifies as the other.

use crate::core::config::AuthConfig;
use chrono::Duration;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims embedded in an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

/// Claims embedded in a refresh token. No role: the role is re-read from
/// storage when the token is redeemed, so role changes take effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

/// Token verification/signing errors. Internal to the auth layer; the HTTP
/// boundary only ever sees Unauthorized.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// Issues and verifies both token kinds
pub struct TokenService {
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_secret: access_secret.to_string(),
            refresh_secret: refresh_secret.to_string(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            &config.access_secret,
            &config.refresh_secret,
            Duration::minutes(config.access_ttl_minutes),
            Duration::days(config.refresh_ttl_days),
        )
    }

    /// Generate an access token for an identity
    pub fn issue_access_token(
        &self,
        user_id: &str,
        email: &str,
        role: &str,
    ) -> Result<String, TokenError> {
        let claims = AccessClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            exp: expiry_timestamp(self.access_ttl),
        };
        sign(&claims, &self.access_secret)
    }

    /// Generate a refresh token for an identity
    pub fn issue_refresh_token(&self, user_id: &str, email: &str) -> Result<String, TokenError> {
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: expiry_timestamp(self.refresh_ttl),
        };
        sign(&claims, &self.refresh_secret)
    }

    /// Verify an access token's signature and expiry
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        verify(token, &self.access_secret)
    }

    /// Verify a refresh token's signature and expiry
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        verify(token, &self.refresh_secret)
    }
}

fn expiry_timestamp(ttl: Duration) -> usize {
    (chrono::Utc::now() + ttl).timestamp() as usize
}

fn sign<C: Serialize>(claims: &C, secret: &str) -> Result<String, TokenError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Signing)
}

fn verify<C: for<'de> Deserialize<'de>>(token: &str, secret: &str) -> Result<C, TokenError> {
    // Expiry is a hard boundary: no clock leeway
    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<C>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })
}

/// Decode access claims without verifying the signature or expiry.
///
/// Only for introspection that grants nothing, such as audit logging
/// which identity presented an expired token.
pub fn decode_unverified(token: &str) -> Result<AccessClaims, TokenError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;

    decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|_| TokenError::Invalid)
}
