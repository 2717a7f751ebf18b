use chrono::{DateTime, Utc};
use eyre::eyre;
use slotbook_core::{
    errors::StoreError,
    models::{appointment::Appointment, availability::Availability, time_slot::TimeSlot},
};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub date: DateTime<Utc>,
    pub time: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbAvailability {
    pub id: String,
    pub blocked_times: Vec<String>,
}

impl TryFrom<DbAppointment> for Appointment {
    type Error = StoreError;

    fn try_from(row: DbAppointment) -> Result<Self, Self::Error> {
        let time = row
            .time
            .parse()
            .map_err(|e| StoreError::Backend(eyre!("appointment {} has {}", row.id, e)))?;

        Ok(Appointment {
            id: row.id.to_string(),
            client_name: row.client_name,
            client_email: row.client_email,
            date: row.date,
            time,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<DbAvailability> for Availability {
    type Error = StoreError;

    fn try_from(row: DbAvailability) -> Result<Self, Self::Error> {
        let blocked_times = row
            .blocked_times
            .iter()
            .map(|label| label.parse::<TimeSlot>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Backend(eyre!("availability {} has {}", row.id, e)))?;

        Ok(Availability {
            id: row.id,
            blocked_times,
        })
    }
}
