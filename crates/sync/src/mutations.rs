use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use slotbook_core::{
    errors::{BookingError, BookingResult},
    models::{
        appointment::{Appointment, NewAppointment},
        availability::Availability,
        policy::WorkingHoursPolicy,
        time_slot::TimeSlot,
    },
    slots::{with_blocked, without_blocked},
    store::SharedStore,
    validation::{validate_appointment_id, validate_new_appointment},
};
use tracing::{info, warn};

use crate::bus::{Invalidation, InvalidationBus, InvalidationScope};
use crate::notify::{Email, Notifier, cancellation_email, confirmation_email};

/// Writes bookings and block lists, then invalidates every live view of the
/// affected date.
#[derive(Clone)]
pub struct BookingService {
    store: SharedStore,
    bus: InvalidationBus,
    policy: WorkingHoursPolicy,
    notifier: Arc<dyn Notifier>,
}

impl BookingService {
    pub fn new(
        store: SharedStore,
        bus: InvalidationBus,
        policy: WorkingHoursPolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            bus,
            policy,
            notifier,
        }
    }

    pub async fn book(&self, request: NewAppointment) -> BookingResult<Appointment> {
        validate_new_appointment(&request, &self.policy, Utc::now().date_naive())?;

        let appointment = self.store.create_appointment(&request).await?;
        info!(
            "Booked {} at {} (id={})",
            request.date, appointment.time, appointment.id
        );

        self.bus
            .publish(Invalidation::new(request.date, InvalidationScope::All))
            .await;
        self.deliver(confirmation_email(&appointment)).await;
        Ok(appointment)
    }

    /// Cancels by id. A missing or blank id is rejected before any store call.
    pub async fn cancel(&self, id: Option<&str>) -> BookingResult<Appointment> {
        let id = validate_appointment_id(id)?;

        let appointment = self
            .store
            .delete_appointment(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Appointment {} not found", id)))?;
        info!("Cancelled appointment {} on {}", id, appointment.day());

        self.bus
            .publish(Invalidation::new(appointment.day(), InvalidationScope::All))
            .await;
        self.deliver(cancellation_email(&appointment)).await;
        Ok(appointment)
    }

    /// Adds `time` to the day's block list. Blocking a booked slot is not
    /// checked here.
    pub async fn block(&self, date: NaiveDate, time: TimeSlot) -> BookingResult<Availability> {
        self.update_blocked(date, time, with_blocked).await
    }

    pub async fn unblock(&self, date: NaiveDate, time: TimeSlot) -> BookingResult<Availability> {
        self.update_blocked(date, time, without_blocked).await
    }

    async fn update_blocked(
        &self,
        date: NaiveDate,
        time: TimeSlot,
        apply: fn(&[TimeSlot], TimeSlot) -> Vec<TimeSlot>,
    ) -> BookingResult<Availability> {
        if !self.policy.contains(time) {
            return Err(BookingError::Validation(format!(
                "{} is not a slot of the working day",
                time
            )));
        }

        let current = self
            .store
            .get_availability(date)
            .await?
            .map(|a| a.blocked_times)
            .unwrap_or_default();
        let updated = self
            .store
            .upsert_availability(date, &apply(&current, time))
            .await?;

        self.bus
            .publish(Invalidation::new(date, InvalidationScope::Availability))
            .await;
        Ok(updated)
    }

    async fn deliver(&self, email: Email) {
        let to = email.to.clone();
        if let Err(e) = self.notifier.send_email(email).await {
            warn!("Failed to send email to {}: {}", to, e);
        }
    }
}
