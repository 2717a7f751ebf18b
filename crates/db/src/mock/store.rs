use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::mock;
use slotbook_core::{
    errors::StoreResult,
    models::{
        appointment::{Appointment, NewAppointment},
        availability::Availability,
        time_slot::TimeSlot,
    },
    store::{AppointmentQuery, AppointmentStore, Subscription},
};

// Mock store for testing; any call without a matching expectation panics
mock! {
    pub Store {}

    #[async_trait]
    impl AppointmentStore for Store {
        async fn query_appointments(&self, query: &AppointmentQuery) -> StoreResult<Vec<Appointment>>;

        async fn get_availability(&self, date: NaiveDate) -> StoreResult<Option<Availability>>;

        async fn subscribe_appointments(&self, query: AppointmentQuery) -> StoreResult<Subscription>;

        async fn create_appointment(&self, appointment: &NewAppointment) -> StoreResult<Appointment>;

        async fn delete_appointment(&self, id: &str) -> StoreResult<Option<Appointment>>;

        async fn upsert_availability(
            &self,
            date: NaiveDate,
            blocked_times: &[TimeSlot],
        ) -> StoreResult<Availability>;

        async fn health_check(&self) -> StoreResult<()>;

        async fn shutdown(&self);
    }
}
