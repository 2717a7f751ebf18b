//! # API Configuration Module
//!
//! This module loads the Slotbook server configuration from environment
//! variables and provides defaults where appropriate.
//!
//! ## Environment Variables
//!
//! - `API_HOST`: The host address to bind the server to (default: "0.0.0.0")
//! - `API_PORT`: The port to listen on (default: 3000)
//! - `DATABASE_URL`: PostgreSQL connection string. When unset the server runs
//!   on the in-memory store
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `API_CORS_ORIGINS`: Comma-separated list of allowed CORS origins
//! - `API_REQUEST_TIMEOUT_SECONDS`: Per-request timeout (default: 30)
//! - `ADMIN_PASSWORD_HASH`: Argon2 PHC string guarding the admin endpoints
//! - `WORKING_HOURS_START` / `WORKING_HOURS_END`: Opening window in whole
//!   hours (default: 9 and 17)
//! - `SLOT_INTERVAL_MINUTES`: Slot length (default: 30)
//! - `MAX_LIVE_DATES`: Live date views kept per surface (default: 32)

use eyre::{Result, WrapErr};
use slotbook_core::models::policy::{
    DEFAULT_WORKING_HOURS, SLOT_INTERVAL_MINUTES, WorkingHoursPolicy,
};
use slotbook_sync::{DEFAULT_MAX_LIVE_DATES, HubConfig};
use std::env;
use std::str::FromStr;
use tracing::Level;

/// Configuration for the Slotbook API server
///
/// # Example
///
/// ```no_run
/// use eyre::Result;
/// use slotbook_api::config::ApiConfig;
///
/// fn example() -> Result<()> {
///     let config = ApiConfig::from_env()?;
///     println!("Starting server on {}", config.server_addr());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host address for the API server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port for the API server to listen on
    pub port: u16,

    /// PostgreSQL database connection string (optional)
    pub database_url: Option<String>,

    /// Log level for the application
    pub log_level: Level,

    /// CORS allowed origins (optional)
    pub cors_origins: Option<Vec<String>>,

    /// Argon2 hash of the admin password. Admin endpoints are closed without it.
    pub admin_password_hash: Option<String>,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Working hours and slot length
    pub policy: WorkingHoursPolicy,

    /// Live date views kept per surface
    pub max_live_dates: usize,
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .wrap_err_with(|| format!("Invalid {} value", name)),
        None => Ok(default),
    }
}

impl ApiConfig {
    /// Creates a new ApiConfig from environment variables
    ///
    /// # Errors
    ///
    /// See [`ApiConfig::from_vars`].
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Creates a new ApiConfig from any variable source
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The API_PORT or API_REQUEST_TIMEOUT_SECONDS value cannot be parsed
    /// - A working-hours variable cannot be parsed or the resulting policy
    ///   is empty
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Network settings
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_var(&lookup, "API_PORT", 3000u16)?;

        // Database settings
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        // Logging settings
        let log_level = match lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()).as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        // CORS settings
        let cors_origins = lookup("API_CORS_ORIGINS").map(|origins| {
            origins.split(',').map(|s| s.trim().to_string()).collect()
        });

        // Security settings
        let admin_password_hash = lookup("ADMIN_PASSWORD_HASH");

        // Performance settings
        let request_timeout = parse_var(&lookup, "API_REQUEST_TIMEOUT_SECONDS", 30u64)?;

        // Booking policy
        let policy = WorkingHoursPolicy::new(
            parse_var(&lookup, "WORKING_HOURS_START", DEFAULT_WORKING_HOURS.start)?,
            parse_var(&lookup, "WORKING_HOURS_END", DEFAULT_WORKING_HOURS.end)?,
            parse_var(&lookup, "SLOT_INTERVAL_MINUTES", SLOT_INTERVAL_MINUTES)?,
        )
        .wrap_err("Invalid working hours configuration")?;
        let max_live_dates = parse_var(&lookup, "MAX_LIVE_DATES", DEFAULT_MAX_LIVE_DATES)?;

        Ok(Self {
            host,
            port,
            database_url,
            log_level,
            cors_origins,
            admin_password_hash,
            request_timeout,
            policy,
            max_live_dates,
        })
    }

    /// Returns the server address as a string (e.g., "127.0.0.1:8080")
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            policy: self.policy,
            max_live_dates: self.max_live_dates,
        }
    }
}
