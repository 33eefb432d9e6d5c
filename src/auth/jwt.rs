use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;

use crate::auth::middleware::Claims;

/// Access token lifetime. One login session covers a day of chatting; there
/// is no refresh flow, clients just log in again.
const ACCESS_TOKEN_TTL_SECS: i64 = 86_400;

/// Load or generate the JWT signing key (256-bit random secret).
/// Key is stored as raw bytes in data_dir/jwt_secret.
pub fn load_or_generate_jwt_secret(data_dir: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let key_path = Path::new(data_dir).join("jwt_secret");

    if key_path.exists() {
        let key = std::fs::read(&key_path)?;
        if key.len() == 32 {
            tracing::info!("JWT signing key loaded from {}", key_path.display());
            return Ok(key);
        }
        // Invalid key file — regenerate
        tracing::warn!("JWT key file has wrong size ({}), regenerating", key.len());
    }

    let key: [u8; 32] = rand::rng().random();
    std::fs::write(&key_path, key)?;
    tracing::info!("JWT signing key generated at {}", key_path.display());
    Ok(key.to_vec())
}

/// Issue an access token whose subject is the verified phone number.
/// This token is the capability that lets a connection register that phone
/// on the relay.
pub fn issue_access_token(
    secret: &[u8],
    phone: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: phone.to_string(),
        iat: now,
        exp: now + ACCESS_TOKEN_TTL_SECS,
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

/// Validate an access token and return its claims.
pub fn validate_access_token(
    secret: &[u8],
    token: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)?;
    Ok(token_data.claims)
}
