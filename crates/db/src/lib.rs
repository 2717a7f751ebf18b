//! # Slotbook store adapters
//!
//! Implementations of [`slotbook_core::store::AppointmentStore`]:
//!
//! - [`postgres::PgStore`] keeps appointments and block lists in PostgreSQL
//!   and pushes changes through `LISTEN`/`NOTIFY`.
//! - [`memory::MemoryStore`] keeps everything in process, for development
//!   without a database and for tests.

pub mod memory;
pub mod mock;
pub mod models;
pub mod postgres;
pub mod schema;

use eyre::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

pub type DbPool = Pool<Postgres>;

pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Builds a pool without connecting, so the server can start while the
/// database is unreachable and report the store as unavailable instead.
pub fn create_lazy_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_lazy(database_url)?;

    Ok(pool)
}
