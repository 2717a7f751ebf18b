use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/slots/:date", get(handlers::slots::get_slots))
        .route("/api/appointments", post(handlers::slots::book_appointment))
}
