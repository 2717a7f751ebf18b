//! # Slotbook API
//!
//! HTTP surface of the Slotbook booking service.
//!
//! ## Architecture
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate requests into [`SyncHub`] calls
//! - **Middleware**: Admin authentication and error mapping
//! - **Config**: Environment configuration
//!
//! Reads go through the hub's live views and writes through its booking
//! service, so a mutation made here is visible on both surfaces at once.

/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Middleware for authentication and error handling
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    error_handling::HandleErrorLayer,
    http::{HeaderValue, Method, StatusCode, header},
};
use eyre::Result;
use slotbook_core::store::SharedStore;
use slotbook_sync::{SyncHub, notify::LogNotifier};
use tokio::net::TcpListener;
use tower::{BoxError, ServiceBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Shared application state that is accessible to all request handlers
pub struct ApiState {
    /// Live views and booking service over the configured store
    pub hub: SyncHub,
    /// Argon2 hash of the admin password
    pub admin_password_hash: Option<String>,
}

/// Builds the router with every route and the shared state attached.
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Public booking endpoints
        .merge(routes::slots::routes())
        // Admin endpoints
        .merge(routes::admin::routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_origin(allowed)
        .allow_credentials(true)
}

async fn handle_timeout(err: BoxError) -> StatusCode {
    if err.is::<tower::timeout::error::Elapsed>() {
        StatusCode::REQUEST_TIMEOUT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Starts the API server over `store`
///
/// Builds the sync hub, serves until Ctrl-C, then shuts the hub (and with it
/// the store) down.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use slotbook_api::{config::ApiConfig, start_server};
/// use slotbook_db::memory::MemoryStore;
///
/// # async fn run() -> eyre::Result<()> {
/// let config = ApiConfig::from_env()?;
/// start_server(config, Arc::new(MemoryStore::new())).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_server(config: config::ApiConfig, store: SharedStore) -> Result<()> {
    if config.admin_password_hash.is_none() {
        warn!("ADMIN_PASSWORD_HASH is not set, admin endpoints are closed");
    }

    let hub = SyncHub::new(store, config.hub_config(), Arc::new(LogNotifier));
    let state = Arc::new(ApiState {
        hub: hub.clone(),
        admin_password_hash: config.admin_password_hash.clone(),
    });

    let app = build_router(state);

    // Apply CORS configuration if origins are specified
    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)),
        None => app,
    };

    // Add request timeout middleware
    let app = app.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout))
            .timeout(Duration::from_secs(config.request_timeout)),
    );

    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    hub.shutdown().await;
    info!("Server stopped");
    Ok(())
}
