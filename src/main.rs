use std::sync::Arc;

use color_eyre::eyre::Result;
use dotenv::dotenv;
use slotbook_api::config::ApiConfig;
use slotbook_core::store::SharedStore;
use slotbook_db::{create_lazy_pool, memory::MemoryStore, postgres::PgStore, schema::initialize_database};
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = ApiConfig::from_env()?;

    // Initialize tracing for logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let store: SharedStore = match &config.database_url {
        Some(url) => {
            // Lazy so the server still starts while the database is down
            let pool = create_lazy_pool(url)?;
            if let Err(e) = initialize_database(&pool).await {
                warn!("Could not initialize database schema: {}", e);
            }
            info!("Using PostgreSQL store");
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL is not set, bookings are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    // Start API server
    slotbook_api::start_server(config, store).await?;

    Ok(())
}
