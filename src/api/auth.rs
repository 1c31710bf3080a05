//! Admin authentication: argon2 password hashes, opaque session tokens
//! stored hashed, and a config-file API token for non-interactive clients.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::db::{LoginRequest, LoginResponse, Session, User, UserResponse};
use crate::AppState;

use super::error::ApiError;

/// Response for setup status check
#[derive(Serialize)]
pub struct SetupStatusResponse {
    pub needs_setup: bool,
}

/// Request for initial setup
#[derive(Deserialize)]
pub struct SetupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validate password strength.
/// Returns None if valid, or Some(error_message) if invalid
fn validate_password_strength(password: &str) -> Option<String> {
    if password.len() < 12 {
        return Some("Password must be at least 12 characters".to_string());
    }

    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_uppercase {
        return Some("Password must contain at least one uppercase letter".to_string());
    }
    if !has_lowercase {
        return Some("Password must contain at least one lowercase letter".to_string());
    }
    if !has_digit {
        return Some("Password must contain at least one digit".to_string());
    }

    None
}

/// Issue a session for a user and return the cleartext token.
async fn create_session(db: &crate::db::DbPool, user_id: &str) -> Result<String, ApiError> {
    let token = generate_token();
    let token_hash = hash_token(&token);

    // 7-day expiry
    let expires_at = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::days(7))
        .ok_or_else(|| ApiError::internal("Clock overflow computing session expiry"))?
        .to_rfc3339();

    let session_id = uuid::Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO sessions (id, user_id, token_hash, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&session_id)
        .bind(user_id)
        .bind(&token_hash)
        .bind(&expires_at)
        .execute(db)
        .await?;

    Ok(token)
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = create_session(&state.db, &user.id).await?;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// Validate token endpoint
pub async fn validate(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
) -> impl IntoResponse {
    let token = match bearer_token(request.headers()) {
        Some(token) => token,
        None => return StatusCode::UNAUTHORIZED,
    };

    let token_hash = hash_token(&token);
    let session: Option<Session> = sqlx::query_as(
        "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')",
    )
    .bind(&token_hash)
    .fetch_optional(&state.db)
    .await
    .ok()
    .flatten();

    match session {
        Some(_) => StatusCode::OK,
        None => StatusCode::UNAUTHORIZED,
    }
}

/// Compare a presented token against the config admin token in constant
/// time.
fn is_admin_token(config: &crate::config::Config, token: &str) -> bool {
    let admin = config.auth.admin_token.as_bytes();
    let provided = token.as_bytes();
    admin.len() == provided.len() && admin.ct_eq(provided).into()
}

/// Auth middleware protecting the admin routes
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer_token(request.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    if is_admin_token(&state.config, &token) {
        return Ok(next.run(request).await);
    }

    // Otherwise, check for a valid session
    let token_hash = hash_token(&token);
    let session: Option<Session> = sqlx::query_as(
        "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')",
    )
    .bind(&token_hash)
    .fetch_optional(&state.db)
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    match session {
        Some(_) => Ok(next.run(request).await),
        None => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Check if initial setup is needed (no users exist)
pub async fn setup_status(State(state): State<Arc<AppState>>) -> Json<SetupStatusResponse> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await
        .unwrap_or((0,));

    Json(SetupStatusResponse {
        needs_setup: count.0 == 0,
    })
}

/// Initial setup endpoint - creates the first admin user
pub async fn setup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetupRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await?;

    if count.0 > 0 {
        return Err(ApiError::forbidden("Setup has already been completed"));
    }

    if let Err(e) = super::validation::validate_email(&request.email) {
        return Err(ApiError::validation_field("email", e));
    }
    if let Some(error) = validate_password_strength(&request.password) {
        return Err(ApiError::validation_field("password", error));
    }
    if request.name.is_empty() {
        return Err(ApiError::validation_field("name", "Name is required"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    sqlx::query("INSERT INTO users (id, email, password_hash, name, role) VALUES (?, ?, ?, ?, ?)")
        .bind(&id)
        .bind(&request.email)
        .bind(&password_hash)
        .bind(&request.name)
        .bind("admin")
        .execute(&state.db)
        .await?;

    tracing::info!("Created admin user during setup: {}", request.email);

    // Auto-login the new admin
    let token = create_session(&state.db, &id).await?;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse {
            id,
            email: request.email,
            name: request.name,
            role: "admin".to_string(),
        },
    }))
}

/// Extract a bearer token from request headers
fn bearer_token(headers: &axum::http::HeaderMap) -> Option<String> {
    let header = headers.get("Authorization")?.to_str().ok()?;
    if let Some(token) = header.strip_prefix("Bearer ") {
        Some(token.to_string())
    } else {
        Some(header.to_string())
    }
}

/// Get the current user from a token
pub async fn get_current_user(
    pool: &crate::db::DbPool,
    config: &crate::config::Config,
    token: &str,
) -> Result<User, StatusCode> {
    // For the config API token, return a synthetic admin user
    if is_admin_token(config, token) {
        let now = chrono::Utc::now().to_rfc3339();
        return Ok(User {
            id: "system".to_string(),
            email: "system@casona.local".to_string(),
            password_hash: String::new(),
            name: "System Admin".to_string(),
            role: "admin".to_string(),
            created_at: now.clone(),
            updated_at: now,
        });
    }

    let token_hash = hash_token(token);
    let session: Option<Session> = sqlx::query_as(
        "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let session = session.ok_or(StatusCode::UNAUTHORIZED)?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&session.user_id)
        .fetch_optional(pool)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    user.ok_or(StatusCode::UNAUTHORIZED)
}

/// Extractor for getting the current authenticated user from a request
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;
        get_current_user(&state.db, &state.config, &token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("Correct-Horse-7").unwrap();
        assert!(verify_password("Correct-Horse-7", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("short").is_some());
        assert!(validate_password_strength("alllowercase123").is_some());
        assert!(validate_password_strength("ALLUPPERCASE123").is_some());
        assert!(validate_password_strength("NoDigitsAtAllHere").is_some());
        assert!(validate_password_strength("GoodPassword123").is_none());
    }

    #[test]
    fn test_admin_token_compare() {
        let mut config = crate::config::Config::default();
        config.auth.admin_token = "casona-admin-token".to_string();
        assert!(is_admin_token(&config, "casona-admin-token"));
        assert!(!is_admin_token(&config, "casona-admin-toke"));
        assert!(!is_admin_token(&config, "casona-admin-tokem"));
        assert!(!is_admin_token(&config, ""));
    }

    #[test]
    fn test_token_hash_is_stable() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), hash_token("other"));
    }
}
