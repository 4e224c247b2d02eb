//! Credential service: password hashing and bearer token issuance.
//!
//! Passwords are hashed with Argon2id after truncation to 72 bytes, so a
//! password and any extension of it beyond that limit verify identically.
//! Tokens are HMAC-signed JWTs carrying the user id in `sub`.

use std::time::Duration as StdDuration;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Result, ServerError};

/// Longest password prefix that participates in hashing
pub const MAX_PASSWORD_BYTES: usize = 72;

fn truncated(password: &str) -> &[u8] {
    let bytes = password.as_bytes();
    &bytes[..bytes.len().min(MAX_PASSWORD_BYTES)]
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(truncated(password), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServerError::Internal(format!("password hashing failed: {}", e)))
}

/// Check a password against a stored digest. Malformed digests never match.
pub fn verify_password(password: &str, digest: &str) -> bool {
    let parsed = match PasswordHash::new(digest) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(truncated(password), &parsed)
        .is_ok()
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id, decimal)
    pub sub: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// Issued at
    pub iat: i64,
}

/// A freshly issued bearer token
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Issues and validates bearer tokens. Holds no per-token state.
pub struct AuthManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl AuthManager {
    pub fn new(secret: &[u8], algorithm: Algorithm, token_ttl: StdDuration) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            token_ttl: i64::try_from(token_ttl.as_secs())
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.secret_key.as_bytes(), config.algorithm, config.token_ttl)
    }

    /// Issue a token for a user with the configured lifetime
    pub fn issue_token(&self, user_id: i32) -> Result<IssuedToken> {
        self.issue_token_with_ttl(user_id, self.token_ttl)
    }

    pub fn issue_token_with_ttl(&self, user_id: i32, ttl: Duration) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(ttl)
            .ok_or_else(|| ServerError::Internal("token lifetime out of range".to_string()))?;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| ServerError::Internal(format!("token encoding failed: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Validate a token and return the user id it was issued for
    pub fn resolve_token(&self, token: &str) -> Result<i32> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            ServerError::Unauthorized
        })?;

        data.claims
            .sub
            .parse::<i32>()
            .map_err(|_| ServerError::Unauthorized)
    }

    /// Extract the token from an `Authorization: Bearer ...` header value
    pub fn bearer_token(auth_header: &str) -> Result<&str> {
        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(ServerError::Unauthorized)?
            .trim();
        if token.is_empty() {
            return Err(ServerError::Unauthorized);
        }
        Ok(token)
    }
}
