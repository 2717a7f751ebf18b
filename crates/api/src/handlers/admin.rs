//! # Admin Handlers
//!
//! Day overview, cancellation and slot blocking. Every route here sits behind
//! [`require_admin`](crate::middleware::auth::require_admin).

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::NaiveDate;
use serde::Serialize;
use slotbook_core::errors::BookingError;
use slotbook_core::models::{
    appointment::Appointment,
    availability::{DayOverviewResponse, UpdateAvailabilityResponse, parse_date_key},
    time_slot::TimeSlot,
};

use crate::{ApiState, middleware::error_handling::AppError};

#[derive(Debug, Serialize)]
pub struct ReleaseDayResponse {
    pub date: NaiveDate,
    pub released: bool,
}

fn parse_slot(date: &str, time: &str) -> Result<(NaiveDate, TimeSlot), AppError> {
    let date = parse_date_key(date)?;
    let time = time
        .parse::<TimeSlot>()
        .map_err(BookingError::from)?;
    Ok((date, time))
}

/// Appointments, blocked times and per-slot status of one day
///
/// # Endpoint
///
/// ```text
/// GET /api/admin/days/:date
/// ```
pub async fn get_day(
    State(state): State<Arc<ApiState>>,
    Path(date): Path<String>,
) -> Result<Json<DayOverviewResponse>, AppError> {
    let date = parse_date_key(&date)?;
    let overview = state.hub.admin().overview(date).await?;
    Ok(Json(overview))
}

/// Cancels an appointment and returns the removed record
///
/// # Endpoint
///
/// ```text
/// DELETE /api/admin/appointments/:id
/// ```
pub async fn cancel_appointment(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.hub.bookings().cancel(Some(&id)).await?;
    Ok(Json(appointment))
}

/// Blocks a slot
///
/// # Endpoint
///
/// ```text
/// PUT /api/admin/days/:date/blocked/:time
/// ```
///
/// Blocking an already blocked slot is a no-op.
pub async fn block_time(
    State(state): State<Arc<ApiState>>,
    Path((date, time)): Path<(String, String)>,
) -> Result<Json<UpdateAvailabilityResponse>, AppError> {
    let (date, time) = parse_slot(&date, &time)?;
    let availability = state.hub.bookings().block(date, time).await?;

    Ok(Json(UpdateAvailabilityResponse {
        date,
        blocked_times: availability.blocked_times,
    }))
}

/// Unblocks a slot
///
/// # Endpoint
///
/// ```text
/// DELETE /api/admin/days/:date/blocked/:time
/// ```
pub async fn unblock_time(
    State(state): State<Arc<ApiState>>,
    Path((date, time)): Path<(String, String)>,
) -> Result<Json<UpdateAvailabilityResponse>, AppError> {
    let (date, time) = parse_slot(&date, &time)?;
    let availability = state.hub.bookings().unblock(date, time).await?;

    Ok(Json(UpdateAvailabilityResponse {
        date,
        blocked_times: availability.blocked_times,
    }))
}

/// Closes the admin view of a day
///
/// # Endpoint
///
/// ```text
/// DELETE /api/admin/days/:date/view
/// ```
pub async fn release_day(
    State(state): State<Arc<ApiState>>,
    Path(date): Path<String>,
) -> Result<Json<ReleaseDayResponse>, AppError> {
    let date = parse_date_key(&date)?;
    let released = state.hub.admin().deselect(date).await;
    Ok(Json(ReleaseDayResponse { date, released }))
}
