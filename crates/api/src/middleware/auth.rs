//! # Authentication Module
//!
//! Guards the admin endpoints. The admin password is configured as an Argon2
//! PHC string and presented by clients as `Authorization: Bearer <password>`.

use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use eyre::Result;
use slotbook_core::errors::BookingError;
use tracing::warn;

use crate::{ApiState, middleware::error_handling::AppError};

/// Hashes a password using the Argon2 algorithm
///
/// Generates a fresh random salt and returns the hash in PHC string format,
/// ready to be used as `ADMIN_PASSWORD_HASH`.
///
/// # Example
///
/// ```
/// use slotbook_api::middleware::auth::{hash_password, verify_password};
///
/// let hash = hash_password("letmein").unwrap();
/// assert!(verify_password(&hash, "letmein").unwrap());
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| eyre::eyre!("Error hashing password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Checks `password` against a PHC hash. A malformed hash is an error, a
/// wrong password is `Ok(false)`.
pub fn verify_password(hash: &str, password: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| eyre::eyre!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Rejects requests that do not carry the admin password.
///
/// Without a configured hash the admin endpoints are closed to everyone.
pub async fn require_admin(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(hash) = state.admin_password_hash.as_deref() else {
        return Err(AppError(BookingError::PermissionDenied(
            "admin access is not configured".to_string(),
        )));
    };

    let Some(password) = bearer_token(&request) else {
        return Err(AppError(BookingError::Authentication(
            "missing admin credentials".to_string(),
        )));
    };

    match verify_password(hash, password) {
        Ok(true) => Ok(next.run(request).await),
        Ok(false) => Err(AppError(BookingError::Authentication(
            "invalid admin credentials".to_string(),
        ))),
        Err(e) => {
            warn!("Admin password check failed: {}", e);
            Err(AppError(BookingError::Internal(e.into())))
        }
    }
}
