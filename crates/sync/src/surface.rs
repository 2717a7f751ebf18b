use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use slotbook_core::{
    errors::{BookingError, BookingResult},
    models::{availability::DayOverviewResponse, policy::WorkingHoursPolicy, time_slot::TimeSlot},
    store::SharedStore,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::bus::InvalidationBus;
use crate::view::{DateView, SlotsState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Public,
    Admin,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Public => write!(f, "public"),
            Surface::Admin => write!(f, "admin"),
        }
    }
}

type SharedView = Arc<Mutex<DateView>>;

struct Tracked {
    view: SharedView,
    last_selected: u64,
}

/// The live date views of one surface.
///
/// Selecting a date subscribes its view on first use. At most
/// `max_live_dates` views stay live; selecting a new date beyond that evicts
/// the least recently selected one. The date map is only locked to look up or
/// insert a view, so a slow load of one date never holds up another.
pub struct SurfaceViews {
    surface: Surface,
    store: SharedStore,
    bus: InvalidationBus,
    policy: WorkingHoursPolicy,
    max_live_dates: usize,
    views: Mutex<HashMap<NaiveDate, Tracked>>,
    clock: AtomicU64,
}

impl SurfaceViews {
    pub fn new(
        surface: Surface,
        store: SharedStore,
        bus: InvalidationBus,
        policy: WorkingHoursPolicy,
        max_live_dates: usize,
    ) -> Self {
        Self {
            surface,
            store,
            bus,
            policy,
            max_live_dates: max_live_dates.max(1),
            views: Mutex::new(HashMap::new()),
            clock: AtomicU64::new(0),
        }
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    /// Selects `date` and reports its slots. A view whose initial load failed
    /// is retried on every selection.
    pub async fn select(&self, date: NaiveDate) -> SlotsState {
        let view = self.acquire(date).await;
        let mut view = view.lock().await;
        if let Err(err) = view.subscribe().await {
            debug!("{} selection of {} failed: {}", self.surface, date, err);
        }
        view.slots_state().await
    }

    /// Selects `date` and returns its bookable slots, or the load error.
    pub async fn available_slots(&self, date: NaiveDate) -> BookingResult<Vec<TimeSlot>> {
        let view = self.acquire(date).await;
        let mut view = view.lock().await;
        view.subscribe().await?;
        match view.slots_state().await {
            SlotsState::Ready(slots) => Ok(slots),
            other => Err(BookingError::ServiceUnavailable(other.to_string())),
        }
    }

    /// Selects `date` and returns the admin overview, or the load error.
    pub async fn overview(&self, date: NaiveDate) -> BookingResult<DayOverviewResponse> {
        let view = self.acquire(date).await;
        let mut view = view.lock().await;
        view.subscribe().await?;
        view.overview().await.ok_or_else(|| {
            BookingError::ServiceUnavailable(format!("{} is not loaded", date))
        })
    }

    /// Current state of `date` without selecting it.
    pub async fn peek(&self, date: NaiveDate) -> Option<SlotsState> {
        let view = self.views.lock().await.get(&date).map(|t| Arc::clone(&t.view))?;
        let view = view.lock().await;
        Some(view.slots_state().await)
    }

    /// Unsubscribes `date`. Returns false if it was not tracked.
    pub async fn deselect(&self, date: NaiveDate) -> bool {
        let removed = self.views.lock().await.remove(&date);
        match removed {
            Some(tracked) => {
                tracked.view.lock().await.unsubscribe().await;
                true
            }
            None => false,
        }
    }

    pub async fn live_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.views.lock().await.keys().copied().collect();
        dates.sort();
        dates
    }

    pub async fn shutdown(&self) {
        let drained: Vec<Tracked> = self.views.lock().await.drain().map(|(_, t)| t).collect();
        let count = drained.len();
        for tracked in drained {
            tracked.view.lock().await.unsubscribe().await;
        }
        info!("{} surface shut down, {} view(s) closed", self.surface, count);
    }

    /// Returns the view for `date`, creating it if needed, and closes any
    /// views evicted to make room.
    async fn acquire(&self, date: NaiveDate) -> SharedView {
        let (view, evicted) = {
            let mut views = self.views.lock().await;
            self.track(&mut views, date)
        };
        for (evicted_date, view) in evicted {
            debug!("Evicting {} view for {}", self.surface, evicted_date);
            view.lock().await.unsubscribe().await;
        }
        view
    }

    fn track(
        &self,
        views: &mut HashMap<NaiveDate, Tracked>,
        date: NaiveDate,
    ) -> (SharedView, Vec<(NaiveDate, SharedView)>) {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed);
        let mut evicted = Vec::new();

        if !views.contains_key(&date) {
            while views.len() >= self.max_live_dates {
                let Some(oldest) = views
                    .iter()
                    .min_by_key(|(_, t)| t.last_selected)
                    .map(|(d, _)| *d)
                else {
                    break;
                };
                if let Some(tracked) = views.remove(&oldest) {
                    evicted.push((oldest, tracked.view));
                }
            }
        }

        let tracked = views.entry(date).or_insert_with(|| Tracked {
            view: Arc::new(Mutex::new(DateView::new(
                self.store.clone(),
                self.bus.clone(),
                self.surface,
                date,
                &self.policy,
            ))),
            last_selected: tick,
        });
        tracked.last_selected = tick;
        (Arc::clone(&tracked.view), evicted)
    }
}
