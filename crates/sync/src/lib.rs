//! Live availability views for the public and admin surfaces.
//!
//! [`SyncHub`] wires one store into both surfaces, the invalidation bus and
//! the booking service. Nothing here holds a global store handle.

use std::sync::Arc;

use slotbook_core::{models::policy::WorkingHoursPolicy, store::SharedStore};
use tracing::info;

pub mod bus;
pub mod mutations;
pub mod notify;
pub mod surface;
pub mod view;

use bus::InvalidationBus;
use mutations::BookingService;
use notify::Notifier;
use surface::{Surface, SurfaceViews};

pub const DEFAULT_MAX_LIVE_DATES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    pub policy: WorkingHoursPolicy,
    pub max_live_dates: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            policy: WorkingHoursPolicy::default(),
            max_live_dates: DEFAULT_MAX_LIVE_DATES,
        }
    }
}

#[derive(Clone)]
pub struct SyncHub {
    store: SharedStore,
    bus: InvalidationBus,
    policy: WorkingHoursPolicy,
    public: Arc<SurfaceViews>,
    admin: Arc<SurfaceViews>,
    bookings: BookingService,
}

impl SyncHub {
    pub fn new(store: SharedStore, config: HubConfig, notifier: Arc<dyn Notifier>) -> Self {
        let bus = InvalidationBus::new();
        let surface = |kind| {
            Arc::new(SurfaceViews::new(
                kind,
                store.clone(),
                bus.clone(),
                config.policy,
                config.max_live_dates,
            ))
        };
        let public = surface(Surface::Public);
        let admin = surface(Surface::Admin);
        let bookings = BookingService::new(store.clone(), bus.clone(), config.policy, notifier);

        Self {
            store,
            bus,
            policy: config.policy,
            public,
            admin,
            bookings,
        }
    }

    pub fn public(&self) -> &SurfaceViews {
        &self.public
    }

    pub fn admin(&self) -> &SurfaceViews {
        &self.admin
    }

    pub fn bookings(&self) -> &BookingService {
        &self.bookings
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    pub fn policy(&self) -> &WorkingHoursPolicy {
        &self.policy
    }

    /// Closes every view on both surfaces, then the store.
    pub async fn shutdown(&self) {
        self.public.shutdown().await;
        self.admin.shutdown().await;
        self.store.shutdown().await;
        info!("Sync hub shut down");
    }
}
