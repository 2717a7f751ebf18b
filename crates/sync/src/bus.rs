//! Date-scoped invalidation table.
//!
//! Every live view registers under its date. A mutation, or a view that just
//! applied a pushed snapshot, publishes an [`Invalidation`] and the bus awaits
//! the recompute of every other view registered for that date.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::debug;

/// Which cached data an invalidation makes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
    Appointments,
    Availability,
    All,
}

impl InvalidationScope {
    pub fn appointments(self) -> bool {
        matches!(self, Self::Appointments | Self::All)
    }

    pub fn availability(self) -> bool {
        matches!(self, Self::Availability | Self::All)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invalidation {
    pub date: NaiveDate,
    pub scope: InvalidationScope,
    /// View that caused the change and already holds the fresh data.
    pub origin: Option<ViewId>,
}

impl Invalidation {
    pub fn new(date: NaiveDate, scope: InvalidationScope) -> Self {
        Self {
            date,
            scope,
            origin: None,
        }
    }

    pub fn from_view(date: NaiveDate, scope: InvalidationScope, origin: ViewId) -> Self {
        Self {
            date,
            scope,
            origin: Some(origin),
        }
    }
}

/// Something that can rebuild its derived state on demand.
#[async_trait]
pub trait Recompute: Send + Sync {
    fn id(&self) -> ViewId;

    async fn invalidate(&self, scope: InvalidationScope);
}

type Registry = HashMap<NaiveDate, Vec<Weak<dyn Recompute>>>;

#[derive(Clone, Default)]
pub struct InvalidationBus {
    registry: Arc<RwLock<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl InvalidationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_view_id(&self) -> ViewId {
        ViewId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers `view` for `date`. The bus only keeps a weak reference.
    pub async fn register(&self, date: NaiveDate, view: &Arc<dyn Recompute>) {
        let mut registry = self.registry.write().await;
        let entries = registry.entry(date).or_default();
        let id = view.id();
        entries.retain(|w| w.upgrade().is_some_and(|v| v.id() != id));
        entries.push(Arc::downgrade(view));
    }

    pub async fn unregister(&self, date: NaiveDate, id: ViewId) {
        let mut registry = self.registry.write().await;
        if let Some(entries) = registry.get_mut(&date) {
            entries.retain(|w| w.upgrade().is_some_and(|v| v.id() != id));
            if entries.is_empty() {
                registry.remove(&date);
            }
        }
    }

    /// Number of live views registered for `date`.
    pub async fn registered(&self, date: NaiveDate) -> usize {
        let registry = self.registry.read().await;
        registry
            .get(&date)
            .map(|entries| entries.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Recomputes every view registered for the invalidated date except the
    /// origin, and returns how many were recomputed.
    pub async fn publish(&self, invalidation: Invalidation) -> usize {
        let targets: Vec<Arc<dyn Recompute>> = {
            let mut registry = self.registry.write().await;
            let Some(entries) = registry.get_mut(&invalidation.date) else {
                return 0;
            };
            entries.retain(|w| w.strong_count() > 0);
            let targets = entries
                .iter()
                .filter_map(|w| w.upgrade())
                .filter(|view| Some(view.id()) != invalidation.origin)
                .collect();
            if entries.is_empty() {
                registry.remove(&invalidation.date);
            }
            targets
        };

        debug!(
            "Invalidating {} view(s) for {} ({:?})",
            targets.len(),
            invalidation.date,
            invalidation.scope
        );
        for view in &targets {
            view.invalidate(invalidation.scope).await;
        }
        targets.len()
    }
}
