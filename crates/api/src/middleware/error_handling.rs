//! # Error Handling Middleware
//!
//! Maps booking errors to HTTP status codes and JSON error bodies so every
//! endpoint reports failures the same way.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use slotbook_core::errors::BookingError;
use tracing::error;

/// Application error wrapper that provides HTTP status code mapping
///
/// `AppError` wraps [`BookingError`] and implements `IntoResponse`. The body
/// is `{"error": <message>}` where the message is the user-facing text of
/// the error.
///
/// # Example
///
/// ```
/// use axum::Json;
/// use slotbook_api::middleware::error_handling::AppError;
/// use slotbook_core::errors::BookingError;
///
/// async fn handler(id: Option<String>) -> Result<Json<String>, AppError> {
///     let id = id.ok_or_else(|| BookingError::Validation("id is required".into()))?;
///     Ok(Json(id))
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub BookingError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Authentication(_) => StatusCode::UNAUTHORIZED,
            BookingError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::Store(_) | BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        let body = Json(json!({ "error": self.0.user_message() }));
        (status, body).into_response()
    }
}

/// Allows `?` on `BookingResult` inside handlers.
impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError(err)
    }
}

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(BookingError::Store(err))
    }
}

/// Maps a [`BookingError`] straight to a response.
pub fn map_error(err: BookingError) -> Response {
    AppError(err).into_response()
}
