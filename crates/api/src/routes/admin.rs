use axum::{
    Router, middleware,
    routing::{delete, get, put},
};
use std::sync::Arc;

use crate::{ApiState, handlers, middleware::auth::require_admin};

pub fn routes(state: Arc<ApiState>) -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/admin/days/:date", get(handlers::admin::get_day))
        .route("/api/admin/days/:date/view", delete(handlers::admin::release_day))
        .route(
            "/api/admin/days/:date/blocked/:time",
            put(handlers::admin::block_time).delete(handlers::admin::unblock_time),
        )
        .route(
            "/api/admin/appointments/:id",
            delete(handlers::admin::cancel_appointment),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}
