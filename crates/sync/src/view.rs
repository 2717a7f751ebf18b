//! Per-date live view.
//!
//! A [`DateView`] caches one day's appointments and availability record for a
//! surface, keeps a standing subscription open while it is live, and derives
//! the bookable slots from whole snapshots.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use slotbook_core::{
    errors::{BookingError, BookingResult},
    models::{
        appointment::Appointment,
        availability::{Availability, DayOverviewResponse},
        policy::WorkingHoursPolicy,
        time_slot::TimeSlot,
    },
    slots::{get_available_slots, slot_statuses},
    store::{AppointmentQuery, SharedStore, Subscription, SubscriptionEvent},
};
use tokio::sync::{Mutex, RwLock, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::{Invalidation, InvalidationBus, InvalidationScope, Recompute, ViewId};
use crate::surface::Surface;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewPhase {
    Uninitialized,
    /// Waiting for the initial fetch. `error` is set when it failed.
    Subscribing { error: Option<String> },
    Live,
    Unsubscribed,
}

/// What a surface shows for a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotsState {
    Loading,
    Unavailable(String),
    Ready(Vec<TimeSlot>),
}

impl fmt::Display for SlotsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotsState::Loading => write!(f, "loading"),
            SlotsState::Unavailable(reason) => write!(f, "unavailable: {}", reason),
            SlotsState::Ready(slots) => write!(f, "{} slot(s) available", slots.len()),
        }
    }
}

struct ViewCache {
    phase: ViewPhase,
    appointments: Vec<Appointment>,
    availability: Option<Availability>,
    available: Option<Vec<TimeSlot>>,
    last_error: Option<String>,
}

impl ViewCache {
    fn new() -> Self {
        Self {
            phase: ViewPhase::Uninitialized,
            appointments: Vec::new(),
            availability: None,
            available: None,
            last_error: None,
        }
    }

    fn recompute(&mut self, all_slots: &[TimeSlot]) {
        self.available = Some(get_available_slots(
            all_slots,
            &self.appointments,
            self.availability.as_ref(),
        ));
    }
}

struct ViewShared {
    id: ViewId,
    surface: Surface,
    date: NaiveDate,
    query: AppointmentQuery,
    all_slots: Vec<TimeSlot>,
    store: SharedStore,
    cache: RwLock<ViewCache>,
    /// Held across a refetch and its write so a slow fetch cannot land on
    /// top of newer data.
    refresh: Mutex<()>,
}

impl ViewShared {
    async fn is_live(&self) -> bool {
        self.cache.read().await.phase == ViewPhase::Live
    }

    /// Replaces the cached appointments with a pushed snapshot. Returns false
    /// when the view is not live or the snapshot changes nothing.
    async fn apply_snapshot(&self, appointments: Vec<Appointment>) -> bool {
        let _refresh = self.refresh.lock().await;
        let mut cache = self.cache.write().await;
        if cache.phase != ViewPhase::Live || cache.appointments == appointments {
            return false;
        }
        cache.appointments = appointments;
        cache.recompute(&self.all_slots);
        true
    }

    async fn refetch(
        &self,
        scope: InvalidationScope,
    ) -> BookingResult<(Option<Vec<Appointment>>, Option<Option<Availability>>)> {
        let appointments = if scope.appointments() {
            Some(self.store.query_appointments(&self.query).await?)
        } else {
            None
        };
        let availability = if scope.availability() {
            Some(self.store.get_availability(self.date).await?)
        } else {
            None
        };
        Ok((appointments, availability))
    }
}

#[async_trait]
impl Recompute for ViewShared {
    fn id(&self) -> ViewId {
        self.id
    }

    async fn invalidate(&self, scope: InvalidationScope) {
        let _refresh = self.refresh.lock().await;
        if !self.is_live().await {
            return;
        }

        match self.refetch(scope).await {
            Ok((appointments, availability)) => {
                let mut cache = self.cache.write().await;
                if cache.phase != ViewPhase::Live {
                    return;
                }
                if let Some(appointments) = appointments {
                    cache.appointments = appointments;
                }
                if let Some(availability) = availability {
                    cache.availability = availability;
                }
                cache.last_error = None;
                cache.recompute(&self.all_slots);
            }
            Err(err) => {
                // Keep serving the previous snapshot
                warn!(
                    "Failed to refresh {} view for {}: {}",
                    self.surface, self.date, err
                );
                self.cache.write().await.last_error = Some(err.user_message());
            }
        }
    }
}

async fn pump(
    shared: Arc<ViewShared>,
    bus: InvalidationBus,
    mut subscription: Subscription,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut stop => break,
            event = subscription.next() => match event {
                Some(SubscriptionEvent::Snapshot(appointments)) => {
                    if shared.apply_snapshot(appointments).await {
                        bus.publish(Invalidation::from_view(
                            shared.date,
                            InvalidationScope::Appointments,
                            shared.id,
                        ))
                        .await;
                    }
                }
                Some(SubscriptionEvent::Error(message)) => {
                    warn!(
                        "Appointment subscription error on {} view for {}: {}",
                        shared.surface, shared.date, message
                    );
                }
                None => {
                    warn!(
                        "Appointment subscription for {} view of {} ended",
                        shared.surface, shared.date
                    );
                    break;
                }
            }
        }
    }
    subscription.cancel();
    debug!("Stopped {} view pump for {}", shared.surface, shared.date);
}

/// One surface's live view of one day.
pub struct DateView {
    shared: Arc<ViewShared>,
    bus: InvalidationBus,
    stop: Option<oneshot::Sender<()>>,
    pump: Option<JoinHandle<()>>,
}

impl DateView {
    pub fn new(
        store: SharedStore,
        bus: InvalidationBus,
        surface: Surface,
        date: NaiveDate,
        policy: &WorkingHoursPolicy,
    ) -> Self {
        let shared = Arc::new(ViewShared {
            id: bus.next_view_id(),
            surface,
            date,
            query: AppointmentQuery::for_day(date),
            all_slots: policy.slots(),
            store,
            cache: RwLock::new(ViewCache::new()),
            refresh: Mutex::new(()),
        });
        Self {
            shared,
            bus,
            stop: None,
            pump: None,
        }
    }

    pub fn id(&self) -> ViewId {
        self.shared.id
    }

    pub fn date(&self) -> NaiveDate {
        self.shared.date
    }

    pub async fn phase(&self) -> ViewPhase {
        self.shared.cache.read().await.phase.clone()
    }

    /// Last refresh or subscribe failure, cleared by the next success.
    pub async fn last_error(&self) -> Option<String> {
        self.shared.cache.read().await.last_error.clone()
    }

    /// Loads the day and opens the standing subscription.
    ///
    /// On failure the view stays in [`ViewPhase::Subscribing`] with the error
    /// recorded and no derived slots, so it can be retried. Subscribing a live
    /// view is a no-op; an unsubscribed view cannot be reopened.
    pub async fn subscribe(&mut self) -> BookingResult<()> {
        {
            let mut cache = self.shared.cache.write().await;
            match cache.phase {
                ViewPhase::Live => return Ok(()),
                ViewPhase::Unsubscribed => {
                    return Err(BookingError::ServiceUnavailable(format!(
                        "{} view for {} is closed",
                        self.shared.surface, self.shared.date
                    )));
                }
                _ => {}
            }
            cache.phase = ViewPhase::Subscribing { error: None };
        }

        let (appointments, availability, subscription) = match self.open().await {
            Ok(opened) => opened,
            Err(err) => {
                warn!(
                    "Failed to load {} view for {}: {}",
                    self.shared.surface, self.shared.date, err
                );
                let message = err.user_message();
                let mut cache = self.shared.cache.write().await;
                cache.phase = ViewPhase::Subscribing {
                    error: Some(message.clone()),
                };
                cache.available = None;
                cache.last_error = Some(message);
                return Err(err);
            }
        };

        {
            let mut cache = self.shared.cache.write().await;
            cache.appointments = appointments;
            cache.availability = availability;
            cache.last_error = None;
            cache.recompute(&self.shared.all_slots);
            cache.phase = ViewPhase::Live;
        }

        let as_recompute: Arc<dyn Recompute> = self.shared.clone();
        self.bus.register(self.shared.date, &as_recompute).await;

        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop = Some(stop_tx);
        self.pump = Some(tokio::spawn(pump(
            Arc::clone(&self.shared),
            self.bus.clone(),
            subscription,
            stop_rx,
        )));

        info!("{} view for {} is live", self.shared.surface, self.shared.date);
        Ok(())
    }

    async fn open(&self) -> BookingResult<(Vec<Appointment>, Option<Availability>, Subscription)> {
        let store = &self.shared.store;
        let (appointments, availability) = tokio::try_join!(
            store.query_appointments(&self.shared.query),
            store.get_availability(self.shared.date),
        )?;
        let subscription = store.subscribe_appointments(self.shared.query.clone()).await?;
        Ok((appointments, availability, subscription))
    }

    /// Stops the subscription and drops derived state.
    pub async fn unsubscribe(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.pump.take() {
            if let Err(e) = handle.await {
                warn!("View pump task failed: {}", e);
            }
        }
        self.bus.unregister(self.shared.date, self.shared.id).await;

        let mut cache = self.shared.cache.write().await;
        cache.phase = ViewPhase::Unsubscribed;
        cache.available = None;
        debug!("{} view for {} unsubscribed", self.shared.surface, self.shared.date);
    }

    pub async fn slots_state(&self) -> SlotsState {
        let cache = self.shared.cache.read().await;
        match (&cache.phase, &cache.available) {
            (ViewPhase::Live, Some(slots)) => SlotsState::Ready(slots.clone()),
            (ViewPhase::Subscribing { error: Some(reason) }, _) => {
                SlotsState::Unavailable(reason.clone())
            }
            _ => SlotsState::Loading,
        }
    }

    pub async fn appointments(&self) -> Vec<Appointment> {
        self.shared.cache.read().await.appointments.clone()
    }

    pub async fn availability(&self) -> Option<Availability> {
        self.shared.cache.read().await.availability.clone()
    }

    /// Admin overview of the cached day, or `None` unless the view is live.
    pub async fn overview(&self) -> Option<DayOverviewResponse> {
        let cache = self.shared.cache.read().await;
        if cache.phase != ViewPhase::Live {
            return None;
        }
        let blocked_times = cache
            .availability
            .as_ref()
            .map(|a| a.blocked_times.clone())
            .unwrap_or_default();
        Some(DayOverviewResponse {
            date: self.shared.date,
            appointments: cache.appointments.clone(),
            blocked_times,
            slots: slot_statuses(
                &self.shared.all_slots,
                &cache.appointments,
                cache.availability.as_ref(),
            ),
        })
    }
}

impl Drop for DateView {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}
