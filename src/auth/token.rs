use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::user::{User, UserRole};

/// Claims carried by both access and refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user's unique identifier.
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    /// Issued-at timestamp, seconds since epoch.
    pub iat: usize,
    /// Expiration timestamp, seconds since epoch.
    pub exp: usize,
    /// Random token id; guarantees two tokens for the same user are never
    /// byte-identical even when issued within the same second.
    pub jti: Uuid,
}

/// Signing and verification keys, built once from [`Config`] and shared via
/// application state. Access and refresh tokens use distinct secrets: an
/// access token can never be presented as a refresh token or vice versa.
pub struct JwtKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(config: &Config) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_ttl_minutes),
            refresh_ttl: Duration::days(config.refresh_ttl_days),
        }
    }

    /// Expiry to stamp on the persisted row of a freshly issued refresh token.
    pub fn refresh_expires_at(&self) -> DateTime<Utc> {
        Utc::now() + self.refresh_ttl
    }

    fn claims_for(&self, user: &User, ttl: Duration) -> Claims {
        let now = Utc::now();
        Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp() as usize,
            exp: (now + ttl).timestamp() as usize,
            jti: Uuid::new_v4(),
        }
    }

    /// Signs a short-lived access token. Never persisted, so it cannot be
    /// revoked before expiry (accepted tradeoff).
    pub fn sign_access(&self, user: &User) -> Result<String, AppError> {
        let claims = self.claims_for(user, self.access_ttl);
        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))
    }

    /// Signs a longer-lived refresh token with the refresh secret.
    pub fn sign_refresh(&self, user: &User) -> Result<String, AppError> {
        let claims = self.claims_for(user, self.refresh_ttl);
        encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign refresh token: {}", e)))
    }

    /// Verifies an access token: signature and embedded expiry only, no
    /// storage lookup.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.access_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))
    }

    /// Verifies a refresh token's signature. Storage presence and row expiry
    /// are checked separately by the auth service.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.refresh_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))
    }
}
