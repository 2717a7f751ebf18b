mod common;

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use eyre::eyre;
use fake::{Fake, faker::internet::en::SafeEmail, faker::name::en::Name};
use mockall::mock;
use pretty_assertions::assert_eq;
use slotbook_core::{
    errors::BookingError,
    models::{
        appointment::NewAppointment,
        availability::SlotState,
        policy::WorkingHoursPolicy,
        time_slot::TimeSlot,
    },
    store::{AppointmentStore, SharedStore},
};
use slotbook_db::memory::{Fault, MemoryStore};
use slotbook_db::mock::MockStore;

use common::SlowStore;
use slotbook_sync::{
    HubConfig, SyncHub,
    notify::{Email, LogNotifier, Notifier},
    view::SlotsState,
};

mock! {
    pub Mailer {}

    #[async_trait]
    impl Notifier for Mailer {
        async fn send_email(&self, email: Email) -> eyre::Result<()>;
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Email>>,
}

impl RecordingNotifier {
    fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.subject.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_email(&self, email: Email) -> eyre::Result<()> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

fn day(offset: i64) -> NaiveDate {
    Utc::now().date_naive() + chrono::Duration::days(offset)
}

fn slot(label: &str) -> TimeSlot {
    label.parse().unwrap()
}

fn slots(labels: &[&str]) -> Vec<TimeSlot> {
    labels.iter().map(|l| slot(l)).collect()
}

fn booking(date: NaiveDate, time: &str) -> NewAppointment {
    NewAppointment {
        client_name: Name().fake(),
        client_email: SafeEmail().fake(),
        date,
        time: slot(time),
    }
}

fn hub_with(store: &MemoryStore, config: HubConfig, notifier: Arc<dyn Notifier>) -> SyncHub {
    let shared: SharedStore = Arc::new(store.clone());
    SyncHub::new(shared, config, notifier)
}

/// One-hour working day, so the only slots are 09:00 and 09:30.
fn short_day() -> HubConfig {
    HubConfig {
        policy: WorkingHoursPolicy::new(9, 10, 30).unwrap(),
        ..HubConfig::default()
    }
}

async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[test_log::test(tokio::test)]
async fn test_booking_last_slot_removes_it_everywhere() {
    let store = MemoryStore::new();
    let hub = hub_with(&store, short_day(), Arc::new(LogNotifier));
    let date = day(2);

    hub.bookings().book(booking(date, "09:00")).await.unwrap();
    assert_eq!(hub.public().select(date).await, SlotsState::Ready(slots(&["09:30"])));
    hub.admin().overview(date).await.unwrap();

    let last = hub.bookings().book(booking(date, "09:30")).await.unwrap();

    assert_eq!(hub.public().peek(date).await, Some(SlotsState::Ready(vec![])));
    let overview = hub.admin().overview(date).await.unwrap();
    assert_eq!(overview.appointments.len(), 2);
    assert_eq!(
        overview.slots[1].state,
        SlotState::Booked {
            appointment_id: last.id.clone(),
            client_name: last.client_name.clone(),
        }
    );
}

#[tokio::test]
async fn test_cancel_without_id_never_touches_the_store() {
    // Any store call would panic on the missing expectation
    let store: SharedStore = Arc::new(MockStore::new());
    let hub = SyncHub::new(store, HubConfig::default(), Arc::new(LogNotifier));

    for id in [None, Some(""), Some("   ")] {
        let result = hub.bookings().cancel(id).await;
        assert!(matches!(result, Err(BookingError::Validation(_))), "id {:?}", id);
    }
}

#[tokio::test]
async fn test_invalid_booking_never_touches_the_store() {
    let store = MemoryStore::new();
    let hub = hub_with(&store, HubConfig::default(), Arc::new(LogNotifier));

    let mut past = booking(day(-1), "10:00");
    let result = hub.bookings().book(past.clone()).await;
    assert!(matches!(result, Err(BookingError::Validation(_))));

    past.date = day(1);
    past.client_email = "not-an-email".to_string();
    assert!(hub.bookings().book(past).await.is_err());

    assert!(hub.bookings().book(booking(day(1), "17:00")).await.is_err());
    assert_eq!(store.call_count(), 0);
}

#[test_log::test(tokio::test)]
async fn test_offline_store_is_unavailable_not_empty() {
    let store = MemoryStore::new();
    let hub = hub_with(&store, short_day(), Arc::new(LogNotifier));
    let date = day(1);

    store.set_fault(Some(Fault::Offline)).await;
    let state = hub.public().select(date).await;
    assert!(matches!(state, SlotsState::Unavailable(_)), "got {:?}", state);
    assert!(matches!(
        hub.admin().overview(date).await,
        Err(BookingError::ServiceUnavailable(_))
    ));

    store.set_fault(None).await;
    assert_eq!(
        hub.public().select(date).await,
        SlotsState::Ready(slots(&["09:00", "09:30"]))
    );
}

#[test_log::test(tokio::test)]
async fn test_external_write_reaches_both_surfaces() {
    let store = MemoryStore::new();
    let hub = hub_with(&store, short_day(), Arc::new(LogNotifier));
    let date = day(3);
    hub.public().select(date).await;
    hub.admin().select(date).await;

    // Written by another client, so only the subscriptions see it
    store.create_appointment(&booking(date, "09:00")).await.unwrap();

    let hub_ref = &hub;
    assert!(
        eventually(move || async move {
            hub_ref.public().peek(date).await == Some(SlotsState::Ready(vec![slot("09:30")]))
        })
        .await
    );
    assert!(
        eventually(move || async move {
            hub_ref.admin().peek(date).await == Some(SlotsState::Ready(vec![slot("09:30")]))
        })
        .await
    );
}

#[test_log::test(tokio::test)]
async fn test_subscription_error_keeps_view_live() {
    let store = MemoryStore::new();
    let hub = hub_with(&store, short_day(), Arc::new(LogNotifier));
    let date = day(4);
    hub.public().select(date).await;

    store.emit_subscription_error("listener dropped");
    store.create_appointment(&booking(date, "09:30")).await.unwrap();

    let hub_ref = &hub;
    assert!(
        eventually(move || async move {
            hub_ref.public().peek(date).await == Some(SlotsState::Ready(vec![slot("09:00")]))
        })
        .await
    );
}

#[tokio::test]
async fn test_block_and_unblock_refresh_views() {
    let store = MemoryStore::new();
    let hub = hub_with(&store, short_day(), Arc::new(LogNotifier));
    let date = day(2);
    hub.public().select(date).await;

    let updated = hub.bookings().block(date, slot("09:30")).await.unwrap();
    assert_eq!(updated.blocked_times, slots(&["09:30"]));
    assert_eq!(hub.public().peek(date).await, Some(SlotsState::Ready(slots(&["09:00"]))));

    let overview = hub.admin().overview(date).await.unwrap();
    assert_eq!(overview.blocked_times, slots(&["09:30"]));
    assert_eq!(overview.slots[1].state, SlotState::Blocked);
    assert!(overview.slots[1].can_toggle_block());

    // Blocking twice leaves a single entry
    hub.bookings().block(date, slot("09:30")).await.unwrap();
    let cleared = hub.bookings().unblock(date, slot("09:30")).await.unwrap();
    assert!(cleared.blocked_times.is_empty());
    assert_eq!(
        hub.public().peek(date).await,
        Some(SlotsState::Ready(slots(&["09:00", "09:30"])))
    );
}

#[tokio::test]
async fn test_block_rejects_times_off_the_grid() {
    let store = MemoryStore::new();
    let hub = hub_with(&store, short_day(), Arc::new(LogNotifier));

    let result = hub.bookings().block(day(2), slot("09:15")).await;

    assert!(matches!(result, Err(BookingError::Validation(_))));
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_cancel_frees_slot_and_notifies() {
    let store = MemoryStore::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let hub = hub_with(&store, short_day(), notifier.clone());
    let date = day(2);

    let appointment = hub.bookings().book(booking(date, "09:00")).await.unwrap();
    assert_eq!(hub.public().select(date).await, SlotsState::Ready(slots(&["09:30"])));

    let cancelled = hub.bookings().cancel(Some(&appointment.id)).await.unwrap();

    assert_eq!(cancelled.id, appointment.id);
    assert_eq!(
        hub.public().peek(date).await,
        Some(SlotsState::Ready(slots(&["09:00", "09:30"])))
    );
    assert_eq!(
        notifier.subjects(),
        vec![
            "Your appointment is confirmed".to_string(),
            "Your appointment was cancelled".to_string(),
        ]
    );
    assert!(notifier.sent.lock().unwrap()[0].html.contains("09:00 AM"));
}

#[tokio::test]
async fn test_cancel_unknown_id_is_not_found() {
    let store = MemoryStore::new();
    let hub = hub_with(&store, HubConfig::default(), Arc::new(LogNotifier));

    let result = hub.bookings().cancel(Some("missing")).await;

    assert!(matches!(result, Err(BookingError::NotFound(_))));
}

#[tokio::test]
async fn test_failed_email_does_not_fail_booking() {
    let store = MemoryStore::new();
    let mut mailer = MockMailer::new();
    mailer
        .expect_send_email()
        .times(1)
        .returning(|_| Err(eyre!("smtp unreachable")));
    let hub = hub_with(&store, HubConfig::default(), Arc::new(mailer));

    let result = hub.bookings().book(booking(day(1), "09:00")).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_permission_denied_is_reported() {
    let store = MemoryStore::new();
    let hub = hub_with(&store, HubConfig::default(), Arc::new(LogNotifier));
    store.set_fault(Some(Fault::PermissionDenied)).await;

    let err = hub.bookings().book(booking(day(1), "09:00")).await.unwrap_err();

    assert!(matches!(err, BookingError::PermissionDenied(_)));
    assert!(err.user_message().contains("Permission denied"));
}

#[tokio::test]
async fn test_least_recently_selected_date_is_evicted() {
    let store = MemoryStore::new();
    let config = HubConfig {
        max_live_dates: 2,
        ..short_day()
    };
    let hub = hub_with(&store, config, Arc::new(LogNotifier));

    hub.public().select(day(1)).await;
    hub.public().select(day(2)).await;
    hub.public().select(day(1)).await;
    hub.public().select(day(3)).await;

    assert_eq!(hub.public().live_dates().await, vec![day(1), day(3)]);
    assert_eq!(hub.bus().registered(day(2)).await, 0);
    assert_eq!(hub.public().peek(day(2)).await, None);
}

#[tokio::test]
async fn test_deselect_and_shutdown_unregister_views() {
    let store = MemoryStore::new();
    let hub = hub_with(&store, short_day(), Arc::new(LogNotifier));
    hub.public().select(day(1)).await;
    hub.admin().select(day(1)).await;
    hub.public().select(day(2)).await;
    assert_eq!(hub.bus().registered(day(1)).await, 2);

    assert!(hub.public().deselect(day(1)).await);
    assert!(!hub.public().deselect(day(1)).await);
    assert_eq!(hub.bus().registered(day(1)).await, 1);

    hub.shutdown().await;

    assert!(hub.public().live_dates().await.is_empty());
    assert!(hub.admin().live_dates().await.is_empty());
    assert_eq!(hub.bus().registered(day(1)).await, 0);
    assert_eq!(hub.bus().registered(day(2)).await, 0);
}

#[tokio::test]
async fn test_slow_load_does_not_hold_up_other_dates() {
    let store = Arc::new(SlowStore::new(MemoryStore::new(), Duration::from_millis(300)));
    let shared: SharedStore = store.clone();
    let hub = SyncHub::new(shared, short_day(), Arc::new(LogNotifier));
    store.slow_down_next_query();

    let slow = hub.public().select(day(1));
    let fast = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let start = Instant::now();
        let state = hub.public().select(day(2)).await;
        (state, start.elapsed())
    };
    let (slow, (fast, elapsed)) = tokio::join!(slow, fast);

    assert!(elapsed < Duration::from_millis(150), "waited {:?}", elapsed);
    assert_eq!(fast, SlotsState::Ready(slots(&["09:00", "09:30"])));
    assert_eq!(slow, SlotsState::Ready(slots(&["09:00", "09:30"])));
    assert_eq!(hub.public().live_dates().await, vec![day(1), day(2)]);
}
