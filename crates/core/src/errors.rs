use thiserror::Error;

/// Message shown when a failed write carries no usable detail from the store.
pub const GENERIC_FAILURE_MESSAGE: &str = "The operation could not be completed. Please try again.";

/// Errors raised by a store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Backend(#[from] eyre::Report),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Store error: {0}")]
    Store(eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl BookingError {
    /// Text suitable for a user-facing notification.
    ///
    /// Permission problems get a fixed hint because they usually point at the
    /// store's access rules rather than at a transient fault.
    pub fn user_message(&self) -> String {
        match self {
            BookingError::PermissionDenied(_) => {
                "Permission denied. Check the store's access rules.".to_string()
            }
            BookingError::ServiceUnavailable(_) => {
                "The booking service is currently unavailable.".to_string()
            }
            BookingError::Store(report) => {
                let message = report.to_string();
                if message.trim().is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    message
                }
            }
            BookingError::Internal(_) => GENERIC_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(message) => BookingError::ServiceUnavailable(message),
            StoreError::PermissionDenied(message) => BookingError::PermissionDenied(message),
            StoreError::NotFound(message) => BookingError::NotFound(message),
            StoreError::Backend(report) => BookingError::Store(report),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
