//! Account registration and login: the identity-verifier boundary.
//!
//! This is the only place credentials are checked. A successful login mints
//! the access token whose subject is the verified phone number; the relay
//! itself never sees a password.

use axum::{extract::State, http::StatusCode, Json};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt;
use crate::auth::middleware::Claims;
use crate::db;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user_id: String,
    pub phone: String,
}

/// POST /api/register
/// Create an account: bcrypt-hash the password, insert the row. The phone
/// number is the unique addressing key.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), (StatusCode, String)> {
    let phone = req.phone.trim().to_string();
    if phone.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Phone cannot be empty".to_string()));
    }
    if req.password.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Password cannot be empty".to_string()));
    }

    let db = state.db.clone();
    let password = req.password;
    let insert_phone = phone.clone();

    // bcrypt and SQLite are both blocking work
    let result = tokio::task::spawn_blocking(move || -> Result<String, (StatusCode, String)> {
        let password_hash = hash(&password, DEFAULT_COST)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

        let conn = db
            .lock()
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB lock error: {}", e)))?;

        let user_id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO users (id, phone, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![user_id, insert_phone, password_hash, now],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                (StatusCode::CONFLICT, "User already exists".to_string())
            }
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })?;

        Ok(user_id)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let user_id = result?;
    tracing::info!(phone = %phone, "Account registered");

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, phone })))
}

/// POST /api/login
/// Verify credentials and issue an access token for the phone number.
/// Unknown phone and wrong password produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let db = state.db.clone();
    let phone = req.phone.trim().to_string();
    let password = req.password;

    let user = tokio::task::spawn_blocking(move || -> Result<db::UserRow, (StatusCode, String)> {
        let conn = db
            .lock()
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB lock error: {}", e)))?;

        let user = db::user_by_phone(&conn, &phone)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
            .ok_or((StatusCode::UNAUTHORIZED, "Invalid phone or password".to_string()))?;

        let ok = verify(&password, &user.password_hash)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        if !ok {
            return Err((StatusCode::UNAUTHORIZED, "Invalid phone or password".to_string()));
        }

        Ok(user)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    let token = jwt::issue_access_token(&state.jwt_secret, &user.phone)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    tracing::info!(phone = %user.phone, "Login succeeded");

    Ok(Json(LoginResponse {
        token,
        phone: user.phone,
    }))
}

/// GET /api/user
/// Return the authenticated account. The Claims extractor rejects missing
/// or invalid tokens with 401 before this runs.
pub async fn current_user(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let db = state.db.clone();
    let phone = claims.sub;

    let user = tokio::task::spawn_blocking(move || -> Result<db::UserRow, (StatusCode, String)> {
        let conn = db
            .lock()
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB lock error: {}", e)))?;

        db::user_by_phone(&conn, &phone)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
            .ok_or((StatusCode::UNAUTHORIZED, "Not authenticated".to_string()))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    Ok(Json(UserResponse {
        user_id: user.id,
        phone: user.phone,
    }))
}
