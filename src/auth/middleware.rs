use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use serde::{Deserialize, Serialize};

/// JWT claims extracted from the Authorization: Bearer header.
/// Implements axum's FromRequestParts for use as an extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Verified phone number
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        // JWT secret is placed in request extensions by a middleware layer
        let jwt_secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

        crate::auth::jwt::validate_access_token(&jwt_secret.0, token)
            .map_err(|_| StatusCode::UNAUTHORIZED)
    }
}

/// Newtype wrapper so the secret can live in request extensions.
#[derive(Clone)]
pub struct JwtSecret(pub Vec<u8>);
