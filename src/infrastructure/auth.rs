use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::models::Principal;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: uuid::Uuid,
    pub role: String,
    pub exp: usize,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

pub fn issue_token(
    keys: &JwtKeys,
    principal: &Principal,
    ttl: Duration,
) -> Result<String, AuthError> {
    let expiration = chrono::Utc::now()
        + chrono::Duration::from_std(ttl)
            .map_err(|_| AuthError::Issue("invalid token lifetime".into()))?;
    let claims = Claims {
        sub: principal.user_id,
        role: principal.role.clone(),
        exp: expiration.timestamp() as usize,
    };
    encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
        .map_err(|err| AuthError::Issue(err.to_string()))
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid authorization token")]
    Invalid,
    #[error("failed to issue token: {0}")]
    Issue(String),
}

/// Looks up the caller of a request.
///
/// `Ok(None)` means the request is anonymous. Errors mean credentials were
/// presented but could not be accepted.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn user(&self, headers: &HeaderMap) -> Result<Option<Principal>, AuthError>;
}

/// Accepts HS256 bearer tokens signed with the configured secret.
pub struct JwtAuthProvider {
    keys: JwtKeys,
}

impl JwtAuthProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            keys: JwtKeys::new(secret),
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    async fn user(&self, headers: &HeaderMap) -> Result<Option<Principal>, AuthError> {
        let Some(header_value) = headers.get(header::AUTHORIZATION) else {
            return Ok(None);
        };
        let header_str = header_value.to_str().map_err(|_| AuthError::Invalid)?;
        let token = header_str
            .strip_prefix("Bearer ")
            .ok_or(AuthError::Invalid)?;
        let validation = Validation::new(Algorithm::HS256);
        match decode::<Claims>(token, &self.keys.decoding, &validation) {
            Ok(data) => Ok(Some(Principal {
                user_id: data.claims.sub,
                role: data.claims.role,
            })),
            Err(err) => {
                warn!(error = ?err, "failed to decode jwt");
                Err(AuthError::Invalid)
            }
        }
    }
}
