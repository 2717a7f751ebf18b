//! Store port.
//!
//! The synchronization layer only sees the external document store through
//! [`AppointmentStore`]. Adapters live in `slotbook-db`.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::mpsc;

use crate::errors::StoreResult;
use crate::models::{
    appointment::{Appointment, NewAppointment, end_of_day, start_of_day},
    availability::Availability,
    time_slot::TimeSlot,
};

/// Buffered snapshots per subscription before the producer waits.
pub const SUBSCRIPTION_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Date,
    Time,
}

/// Range filter on the appointment `date` instant (inclusive at both ends)
/// plus ordering keys applied in sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub order_by: Vec<SortKey>,
}

impl AppointmentQuery {
    pub fn for_day(date: NaiveDate) -> Self {
        Self {
            from: start_of_day(date),
            to: end_of_day(date),
            order_by: vec![SortKey::Date, SortKey::Time],
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        appointment.date >= self.from && appointment.date <= self.to
    }

    /// Whether a change on `date` can affect this query's result.
    pub fn covers_day(&self, date: NaiveDate) -> bool {
        date >= self.from.date_naive() && date <= self.to.date_naive()
    }

    pub fn sort(&self, appointments: &mut [Appointment]) {
        appointments.sort_by(|a, b| {
            self.order_by.iter().fold(Ordering::Equal, |ord, key| {
                ord.then_with(|| match key {
                    SortKey::Date => a.date.cmp(&b.date),
                    SortKey::Time => a.time.cmp(&b.time),
                })
            })
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Snapshot(Vec<Appointment>),
    Error(String),
}

/// Standing subscription to the appointments matching a query.
///
/// The first event is the initial snapshot. Producers stop once the handle is
/// cancelled or dropped.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<SubscriptionEvent>,
}

impl Subscription {
    /// Creates a handle and the sender its producer writes to.
    pub fn channel(buffer: usize) -> (mpsc::Sender<SubscriptionEvent>, Subscription) {
        let (tx, events) = mpsc::channel(buffer);
        (tx, Subscription { events })
    }

    /// Next event, or `None` once the producer has gone away.
    pub async fn next(&mut self) -> Option<SubscriptionEvent> {
        self.events.recv().await
    }

    pub fn cancel(mut self) {
        self.events.close();
    }
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn query_appointments(&self, query: &AppointmentQuery) -> StoreResult<Vec<Appointment>>;

    /// Point lookup of a day's availability record. Not found is `Ok(None)`.
    async fn get_availability(&self, date: NaiveDate) -> StoreResult<Option<Availability>>;

    async fn subscribe_appointments(&self, query: AppointmentQuery) -> StoreResult<Subscription>;

    async fn create_appointment(&self, appointment: &NewAppointment) -> StoreResult<Appointment>;

    /// Removes an appointment and returns it, or `None` if no such id existed.
    async fn delete_appointment(&self, id: &str) -> StoreResult<Option<Appointment>>;

    /// Merge-style write of a day's block list, creating the record if absent.
    async fn upsert_availability(
        &self,
        date: NaiveDate,
        blocked_times: &[TimeSlot],
    ) -> StoreResult<Availability>;

    async fn health_check(&self) -> StoreResult<()>;

    async fn shutdown(&self);
}

pub type SharedStore = Arc<dyn AppointmentStore>;
