//! Bearer-token credentials and password hashing.
//!
//! Tokens are HS256 JWTs carrying the user id and role. A verified token is
//! turned into a [`Principal`] once per request by the [`Caller`] extractor;
//! handlers never look at the raw header.

use std::sync::Arc;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use password_hash::{PasswordHash, SaltString};
use raee_rules::{Principal, Role};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::ApiState;
use crate::errors::{ApiError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: i64,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a token for `principal`, valid for `ttl_secs` from now.
pub fn issue_token(secret: &str, principal: &Principal, ttl_secs: u64) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let ttl = i64::try_from(ttl_secs)
        .map_err(|_| ApiError::Config("token TTL too large".to_string()))?;
    let claims = Claims {
        sub: principal.id,
        role: principal.role,
        iat: now,
        exp: now + ttl,
    };
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Verify signature and expiry, returning the caller identity.
pub fn verify_token(secret: &str, token: &str) -> Result<Principal> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        debug!("Rejected bearer token: {e}");
        ApiError::Unauthorized("invalid token".to_string())
    })?;
    Ok(Principal::new(data.claims.sub, data.claims.role))
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Hash `password` into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| ApiError::Password(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| ApiError::Password(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Password(e.to_string()))?
        .to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Principal);

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
        let token = bearer_token(header)
            .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".to_string()))?;
        let principal = verify_token(&state.config.jwt_secret, token)?;
        Ok(Caller(principal))
    }
}

impl Caller {
    /// Fail with 403 unless the caller holds one of `roles`.
    pub fn require(&self, roles: &[Role]) -> Result<()> {
        if roles.contains(&self.0.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "role {} may not perform this action",
                self.0.role
            )))
        }
    }
}
