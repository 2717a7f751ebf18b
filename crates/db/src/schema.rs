use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

use crate::postgres::APPOINTMENTS_CHANNEL;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create appointments table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            client_name VARCHAR(255) NOT NULL,
            client_email VARCHAR(255) NOT NULL,
            date TIMESTAMP WITH TIME ZONE NOT NULL,
            time VARCHAR(5) NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // One availability record per calendar day, keyed by YYYY-MM-DD
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS availability (
            id VARCHAR(10) PRIMARY KEY,
            blocked_times TEXT[] NOT NULL DEFAULT '{}',
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_appointments_date ON appointments(date);")
        .execute(pool)
        .await?;

    // Push a notification carrying the affected day on every appointment write
    sqlx::query(&format!(
        r#"
        CREATE OR REPLACE FUNCTION notify_appointments_changed() RETURNS trigger AS $$
        BEGIN
            IF TG_OP = 'DELETE' THEN
                PERFORM pg_notify('{APPOINTMENTS_CHANNEL}', to_char(OLD.date AT TIME ZONE 'UTC', 'YYYY-MM-DD'));
                RETURN OLD;
            END IF;
            PERFORM pg_notify('{APPOINTMENTS_CHANNEL}', to_char(NEW.date AT TIME ZONE 'UTC', 'YYYY-MM-DD'));
            RETURN NEW;
        END;
        $$ LANGUAGE plpgsql;
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query("DROP TRIGGER IF EXISTS appointments_changed ON appointments;")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER appointments_changed
        AFTER INSERT OR UPDATE OR DELETE ON appointments
        FOR EACH ROW EXECUTE FUNCTION notify_appointments_changed();
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database schema initialized successfully.");
    Ok(())
}
