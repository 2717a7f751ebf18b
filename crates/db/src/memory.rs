use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use slotbook_core::{
    errors::{StoreError, StoreResult},
    models::{
        appointment::{Appointment, NewAppointment},
        availability::{Availability, date_key},
        time_slot::TimeSlot,
    },
    store::{AppointmentQuery, AppointmentStore, SUBSCRIPTION_BUFFER, Subscription, SubscriptionEvent},
};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

const CHANGE_BUFFER: usize = 64;

/// Failure mode injected into every subsequent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Every call fails as if the backend were unreachable.
    Offline,
    /// Writes are rejected by access rules; reads still succeed.
    PermissionDenied,
}

#[derive(Debug, Clone)]
enum Change {
    Appointments(NaiveDate),
    ListenerError(String),
}

#[derive(Default)]
struct Documents {
    appointments: BTreeMap<String, Appointment>,
    availability: HashMap<String, Availability>,
}

struct Inner {
    documents: RwLock<Documents>,
    changes: broadcast::Sender<Change>,
    fault: RwLock<Option<Fault>>,
    calls: AtomicUsize,
}

impl Inner {
    async fn snapshot(&self, query: &AppointmentQuery) -> Vec<Appointment> {
        let documents = self.documents.read().await;
        let mut appointments: Vec<Appointment> = documents
            .appointments
            .values()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        query.sort(&mut appointments);
        appointments
    }
}

/// In-process document store with push subscriptions.
///
/// Clones share the same documents. Every trait call is counted, and a
/// [`Fault`] can be injected to exercise error paths.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            inner: Arc::new(Inner {
                documents: RwLock::new(Documents::default()),
                changes,
                fault: RwLock::new(None),
                calls: AtomicUsize::new(0),
            }),
        }
    }

    pub async fn set_fault(&self, fault: Option<Fault>) {
        *self.inner.fault.write().await = fault;
    }

    /// Number of store calls made so far.
    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Delivers an error to every open subscription without closing it.
    pub fn emit_subscription_error(&self, message: &str) {
        let _ = self.inner.changes.send(Change::ListenerError(message.to_string()));
    }

    async fn enter(&self, write: bool) -> StoreResult<()> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        match *self.inner.fault.read().await {
            Some(Fault::Offline) => Err(StoreError::Unavailable("memory store is offline".to_string())),
            Some(Fault::PermissionDenied) if write => Err(StoreError::PermissionDenied(
                "missing or insufficient permissions".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn notify(&self, date: NaiveDate) {
        // No receivers simply means nobody is subscribed
        let _ = self.inner.changes.send(Change::Appointments(date));
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn query_appointments(&self, query: &AppointmentQuery) -> StoreResult<Vec<Appointment>> {
        self.enter(false).await?;
        Ok(self.inner.snapshot(query).await)
    }

    async fn get_availability(&self, date: NaiveDate) -> StoreResult<Option<Availability>> {
        self.enter(false).await?;
        let documents = self.inner.documents.read().await;
        Ok(documents.availability.get(&date_key(date)).cloned())
    }

    async fn subscribe_appointments(&self, query: AppointmentQuery) -> StoreResult<Subscription> {
        self.enter(false).await?;

        let mut changes = self.inner.changes.subscribe();
        let initial = self.inner.snapshot(&query).await;
        let (tx, subscription) = Subscription::channel(SUBSCRIPTION_BUFFER);
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            if tx.send(SubscriptionEvent::Snapshot(initial)).await.is_err() {
                return;
            }
            loop {
                let event = tokio::select! {
                    _ = tx.closed() => break,
                    change = changes.recv() => match change {
                        Ok(Change::Appointments(date)) if !query.covers_day(date) => continue,
                        Ok(Change::Appointments(_)) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            SubscriptionEvent::Snapshot(inner.snapshot(&query).await)
                        }
                        Ok(Change::ListenerError(message)) => SubscriptionEvent::Error(message),
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            debug!("Memory subscription closed");
        });

        Ok(subscription)
    }

    async fn create_appointment(&self, appointment: &NewAppointment) -> StoreResult<Appointment> {
        self.enter(true).await?;

        let created = Appointment {
            id: Uuid::new_v4().to_string(),
            client_name: appointment.client_name.clone(),
            client_email: appointment.client_email.clone(),
            date: appointment.date_instant(),
            time: appointment.time,
            created_at: Utc::now(),
        };
        self.inner
            .documents
            .write()
            .await
            .appointments
            .insert(created.id.clone(), created.clone());

        self.notify(appointment.date);
        Ok(created)
    }

    async fn delete_appointment(&self, id: &str) -> StoreResult<Option<Appointment>> {
        self.enter(true).await?;

        let removed = self.inner.documents.write().await.appointments.remove(id);
        if let Some(appointment) = &removed {
            self.notify(appointment.day());
        }
        Ok(removed)
    }

    async fn upsert_availability(
        &self,
        date: NaiveDate,
        blocked_times: &[TimeSlot],
    ) -> StoreResult<Availability> {
        self.enter(true).await?;

        let mut documents = self.inner.documents.write().await;
        let record = documents
            .availability
            .entry(date_key(date))
            .or_insert_with(|| Availability::new(date, Vec::new()));
        record.blocked_times = blocked_times.to_vec();
        Ok(record.clone())
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.enter(false).await
    }

    async fn shutdown(&self) {
        debug!("Memory store shut down");
    }
}
