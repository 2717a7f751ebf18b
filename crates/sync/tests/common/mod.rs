#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use slotbook_core::{
    errors::StoreResult,
    models::{
        appointment::{Appointment, NewAppointment},
        availability::Availability,
        time_slot::TimeSlot,
    },
    store::{AppointmentQuery, AppointmentStore, Subscription},
};
use slotbook_db::memory::MemoryStore;

/// Memory store whose next appointment query answers late. The result is
/// read before the delay, so it reflects the store as of the call.
pub struct SlowStore {
    pub inner: MemoryStore,
    delay: Duration,
    slow_next_query: AtomicBool,
}

impl SlowStore {
    pub fn new(inner: MemoryStore, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            slow_next_query: AtomicBool::new(false),
        }
    }

    pub fn slow_down_next_query(&self) {
        self.slow_next_query.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AppointmentStore for SlowStore {
    async fn query_appointments(&self, query: &AppointmentQuery) -> StoreResult<Vec<Appointment>> {
        let result = self.inner.query_appointments(query).await;
        if self.slow_next_query.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
        }
        result
    }

    async fn get_availability(&self, date: NaiveDate) -> StoreResult<Option<Availability>> {
        self.inner.get_availability(date).await
    }

    async fn subscribe_appointments(&self, query: AppointmentQuery) -> StoreResult<Subscription> {
        self.inner.subscribe_appointments(query).await
    }

    async fn create_appointment(&self, appointment: &NewAppointment) -> StoreResult<Appointment> {
        self.inner.create_appointment(appointment).await
    }

    async fn delete_appointment(&self, id: &str) -> StoreResult<Option<Appointment>> {
        self.inner.delete_appointment(id).await
    }

    async fn upsert_availability(
        &self,
        date: NaiveDate,
        blocked_times: &[TimeSlot],
    ) -> StoreResult<Availability> {
        self.inner.upsert_availability(date, blocked_times).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) {
        self.inner.shutdown().await
    }
}
