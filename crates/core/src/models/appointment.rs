use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::time_slot::TimeSlot;

/// A booked slot. Ids and creation instants are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub client_name: String,
    pub client_email: String,
    /// Start of the booked calendar day.
    pub date: DateTime<Utc>,
    pub time: TimeSlot,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }
}

/// Booking request, before the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub client_name: String,
    pub client_email: String,
    pub date: NaiveDate,
    pub time: TimeSlot,
}

impl NewAppointment {
    pub fn date_instant(&self) -> DateTime<Utc> {
        start_of_day(self.date)
    }
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Last whole second of `date`, the inclusive upper bound of a day query.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + chrono::Duration::seconds(24 * 60 * 60 - 1)
}
