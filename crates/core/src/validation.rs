use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{BookingError, BookingResult};
use crate::models::{appointment::NewAppointment, policy::WorkingHoursPolicy};

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("EMAIL_REGEX should compile - this is a bug"));

pub fn validate_email(email: &str) -> BookingResult<()> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(BookingError::Validation(format!("Invalid email address: {email:?}")))
    }
}

pub fn validate_client_name(name: &str) -> BookingResult<()> {
    if name.trim().is_empty() {
        return Err(BookingError::Validation("Client name is required".to_string()));
    }
    Ok(())
}

/// Rejects a missing or blank appointment id.
pub fn validate_appointment_id(id: Option<&str>) -> BookingResult<&str> {
    match id.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(BookingError::Validation(
            "Cannot cancel the appointment because its id is missing".to_string(),
        )),
    }
}

/// Checks a booking before it reaches the store.
pub fn validate_new_appointment(
    request: &NewAppointment,
    policy: &WorkingHoursPolicy,
    today: NaiveDate,
) -> BookingResult<()> {
    validate_client_name(&request.client_name)?;
    validate_email(&request.client_email)?;

    if request.date < today {
        return Err(BookingError::Validation(format!(
            "Cannot book {} because it is in the past",
            request.date
        )));
    }
    if !policy.contains(request.time) {
        return Err(BookingError::Validation(format!(
            "{} is not a bookable slot",
            request.time
        )));
    }
    Ok(())
}
