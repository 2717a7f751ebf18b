use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use eyre::eyre;
use slotbook_core::{
    errors::{StoreError, StoreResult},
    models::{
        appointment::{Appointment, NewAppointment},
        availability::{Availability, date_key},
        time_slot::TimeSlot,
    },
    store::{
        AppointmentQuery, AppointmentStore, SUBSCRIPTION_BUFFER, SortKey, Subscription,
        SubscriptionEvent,
    },
};
use sqlx::postgres::PgListener;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    DbPool,
    models::{DbAppointment, DbAvailability},
};

/// Notification channel fed by the `appointments_changed` trigger. The payload
/// is the affected day as `YYYY-MM-DD`.
pub const APPOINTMENTS_CHANNEL: &str = "appointments_changed";

const INSUFFICIENT_PRIVILEGE: &str = "42501";
const LISTENER_RETRY_DELAY: Duration = Duration::from_secs(1);

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Sorts errors into the classes callers report differently.
pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(INSUFFICIENT_PRIVILEGE) {
            return StoreError::PermissionDenied(db.message().to_string());
        }
    }
    if matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    ) {
        return StoreError::Unavailable(err.to_string());
    }
    StoreError::Backend(eyre::Report::new(err))
}

fn order_clause(order_by: &[SortKey]) -> String {
    if order_by.is_empty() {
        return String::new();
    }
    let columns: Vec<&str> = order_by
        .iter()
        .map(|key| match key {
            SortKey::Date => "date ASC",
            SortKey::Time => "time ASC",
        })
        .collect();
    format!("ORDER BY {}", columns.join(", "))
}

async fn fetch_appointments(pool: &DbPool, query: &AppointmentQuery) -> StoreResult<Vec<Appointment>> {
    let sql = format!(
        r#"
        SELECT id, client_name, client_email, date, time, created_at
        FROM appointments
        WHERE date >= $1 AND date <= $2
        {}
        "#,
        order_clause(&query.order_by)
    );

    let rows = sqlx::query_as::<_, DbAppointment>(&sql)
        .bind(query.from)
        .bind(query.to)
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_error)?;

    rows.into_iter().map(Appointment::try_from).collect()
}

/// True when the notification payload names a day the query covers. Payloads
/// that do not parse are treated as relevant.
fn notification_is_relevant(query: &AppointmentQuery, payload: &str) -> bool {
    match NaiveDate::parse_from_str(payload, "%Y-%m-%d") {
        Ok(day) => query.covers_day(day),
        Err(_) => true,
    }
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn query_appointments(&self, query: &AppointmentQuery) -> StoreResult<Vec<Appointment>> {
        fetch_appointments(&self.pool, query).await
    }

    async fn get_availability(&self, date: NaiveDate) -> StoreResult<Option<Availability>> {
        let row = sqlx::query_as::<_, DbAvailability>(
            r#"
            SELECT id, blocked_times
            FROM availability
            WHERE id = $1
            "#,
        )
        .bind(date_key(date))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(Availability::try_from).transpose()
    }

    async fn subscribe_appointments(&self, query: AppointmentQuery) -> StoreResult<Subscription> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        listener
            .listen(APPOINTMENTS_CHANNEL)
            .await
            .map_err(map_sqlx_error)?;

        // Listen before the first read so no change between the two is lost
        let initial = fetch_appointments(&self.pool, &query).await?;
        let (tx, subscription) = Subscription::channel(SUBSCRIPTION_BUFFER);
        let pool = self.pool.clone();

        tokio::spawn(async move {
            if tx.send(SubscriptionEvent::Snapshot(initial)).await.is_err() {
                return;
            }
            loop {
                let event = tokio::select! {
                    _ = tx.closed() => break,
                    notification = listener.recv() => match notification {
                        Ok(n) if !notification_is_relevant(&query, n.payload()) => continue,
                        Ok(_) => match fetch_appointments(&pool, &query).await {
                            Ok(appointments) => SubscriptionEvent::Snapshot(appointments),
                            Err(e) => SubscriptionEvent::Error(e.to_string()),
                        },
                        Err(e) => {
                            // PgListener reconnects on the next recv
                            warn!("Appointment listener error: {}", e);
                            tokio::time::sleep(LISTENER_RETRY_DELAY).await;
                            SubscriptionEvent::Error(e.to_string())
                        }
                    },
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            debug!("Appointment subscription closed");
        });

        Ok(subscription)
    }

    async fn create_appointment(&self, appointment: &NewAppointment) -> StoreResult<Appointment> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let row = sqlx::query_as::<_, DbAppointment>(
            r#"
            INSERT INTO appointments (id, client_name, client_email, date, time, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, client_name, client_email, date, time, created_at
            "#,
        )
        .bind(id)
        .bind(&appointment.client_name)
        .bind(&appointment.client_email)
        .bind(appointment.date_instant())
        .bind(appointment.time.to_string())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!("Appointment created: id={}", id);
        Appointment::try_from(row)
    }

    async fn delete_appointment(&self, id: &str) -> StoreResult<Option<Appointment>> {
        // An id that is not a UUID cannot name a stored row
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, DbAppointment>(
            r#"
            DELETE FROM appointments
            WHERE id = $1
            RETURNING id, client_name, client_email, date, time, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(Appointment::try_from).transpose()
    }

    async fn upsert_availability(
        &self,
        date: NaiveDate,
        blocked_times: &[TimeSlot],
    ) -> StoreResult<Availability> {
        let labels: Vec<String> = blocked_times.iter().map(ToString::to_string).collect();

        let row = sqlx::query_as::<_, DbAvailability>(
            r#"
            INSERT INTO availability (id, blocked_times, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (id)
            DO UPDATE SET blocked_times = EXCLUDED.blocked_times, updated_at = NOW()
            RETURNING id, blocked_times
            "#,
        )
        .bind(date_key(date))
        .bind(labels)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Availability::try_from(row)
    }

    async fn health_check(&self) -> StoreResult<()> {
        let one = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if one == 1 {
            Ok(())
        } else {
            Err(StoreError::Backend(eyre!("unexpected health check result {}", one)))
        }
    }

    async fn shutdown(&self) {
        self.pool.close().await;
    }
}
