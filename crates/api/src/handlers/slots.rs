//! # Public Booking Handlers
//!
//! Endpoints used by clients: reading the bookable slots of a day and
//! booking one of them.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use slotbook_core::models::{
    appointment::{Appointment, NewAppointment},
    availability::{AvailableSlotsResponse, parse_date_key},
};
use tracing::info;

use crate::{ApiState, middleware::error_handling::AppError};

/// Lists the slots of a day that are neither booked nor blocked
///
/// # Endpoint
///
/// ```text
/// GET /api/slots/:date
/// ```
///
/// `date` is `YYYY-MM-DD`. A store that cannot be reached yields
/// `503 Service Unavailable`, never an empty list.
pub async fn get_slots(
    State(state): State<Arc<ApiState>>,
    Path(date): Path<String>,
) -> Result<Json<AvailableSlotsResponse>, AppError> {
    let date = parse_date_key(&date)?;
    let slots = state.hub.public().available_slots(date).await?;

    Ok(Json(AvailableSlotsResponse { date, slots }))
}

/// Books a slot
///
/// # Endpoint
///
/// ```text
/// POST /api/appointments
/// ```
///
/// # Request Body
///
/// ```json
/// {
///   "client_name": "Ada Lovelace",
///   "client_email": "ada@example.com",
///   "date": "2026-11-02",
///   "time": "09:30"
/// }
/// ```
///
/// # Returns
///
/// `201 Created` with the stored appointment, or `400 Bad Request` when the
/// name is blank, the email is malformed, the date is past or the time is not
/// a slot of the working day.
pub async fn book_appointment(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<NewAppointment>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let appointment = state.hub.bookings().book(request).await?;
    info!("Appointment {} booked through the API", appointment.id);

    Ok((StatusCode::CREATED, Json(appointment)))
}
