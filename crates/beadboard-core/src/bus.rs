//! Process-wide typed change bus.
//!
//! Carries the two event kinds from the watch layer to all
//! subscribers, with an independent trailing-edge debounce (window W2)
//! per kind. Lives for the process lifetime; subscriptions come and go.
//!
//! Subscribers get no payload beyond the kind - they must re-fetch to
//! learn what changed.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use crate::{debounce, watcher::WatchTarget};

/// Event kinds carried by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The discovery database changed.
    DiscoveryChanged,
    /// Something in the beads record directory changed.
    BeadsChanged,
}

impl ChangeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DiscoveryChanged => "discovery-changed",
            Self::BeadsChanged => "beads-changed",
        }
    }
}

impl From<WatchTarget> for ChangeKind {
    fn from(target: WatchTarget) -> Self {
        match target {
            WatchTarget::Discovery => Self::DiscoveryChanged,
            WatchTarget::Beads => Self::BeadsChanged,
        }
    }
}

type Callback = Arc<dyn Fn(ChangeKind) + Send + Sync>;
type Registry = Mutex<HashMap<ChangeKind, HashMap<u64, Callback>>>;

struct BusInner {
    listeners: Registry,
    next_id: AtomicU64,
}

impl BusInner {
    fn fire(&self, kind: ChangeKind) {
        // Clone callbacks out of the lock before invoking them
        let callbacks: Vec<Callback> = {
            let listeners = self
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            listeners
                .get(&kind)
                .map(|by_id| by_id.values().cloned().collect())
                .unwrap_or_default()
        };

        tracing::debug!(kind = kind.as_str(), subscribers = callbacks.len(), "change event");
        for callback in callbacks {
            callback(kind);
        }
    }
}

/// Typed event bus with per-kind delivery debounce.
#[derive(Clone)]
pub struct ChangeBus {
    inner: Arc<BusInner>,
    debouncers: Arc<HashMap<ChangeKind, debounce::DebounceHandle>>,
}

impl ChangeBus {
    /// Create a bus with the given delivery-stage window (W2).
    ///
    /// Must be called from within a tokio runtime: each event kind
    /// gets its own debounce task.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        let inner = Arc::new(BusInner {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        });

        let mut debouncers = HashMap::new();
        for kind in [ChangeKind::DiscoveryChanged, ChangeKind::BeadsChanged] {
            let fire_inner = Arc::clone(&inner);
            debouncers.insert(
                kind,
                debounce::spawn(window, move || fire_inner.fire(kind)),
            );
        }

        Self {
            inner,
            debouncers: Arc::new(debouncers),
        }
    }

    /// Feed one raw (already W1-coalesced) signal into the delivery
    /// debounce for its kind.
    pub fn publish_raw(&self, kind: ChangeKind) {
        if let Some(handle) = self.debouncers.get(&kind) {
            handle.signal();
        }
    }

    /// Register a callback for one event kind.
    ///
    /// The returned [`Subscription`] detaches the callback; calling
    /// [`Subscription::unsubscribe`] more than once is a no-op.
    pub fn subscribe<F>(&self, kind: ChangeKind, callback: F) -> Subscription
    where
        F: Fn(ChangeKind) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .insert(id, Arc::new(callback));

        Subscription {
            inner: Arc::clone(&self.inner),
            kind,
            id,
        }
    }
}

/// Handle detaching one subscription from the bus.
pub struct Subscription {
    inner: Arc<BusInner>,
    kind: ChangeKind,
    id: u64,
}

impl Subscription {
    /// Detach the callback. Idempotent: repeated calls are no-ops.
    pub fn unsubscribe(&self) {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(by_id) = listeners.get_mut(&self.kind) {
            by_id.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counting_subscription(
        bus: &ChangeBus,
        kind: ChangeKind,
    ) -> (Subscription, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let sub = bus.subscribe(kind, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (sub, count)
    }

    #[tokio::test(start_paused = true)]
    async fn test_raw_burst_delivers_once() {
        let bus = ChangeBus::new(Duration::from_millis(150));
        let (_sub, count) = counting_subscription(&bus, ChangeKind::BeadsChanged);

        for _ in 0..5 {
            bus.publish_raw(ChangeKind::BeadsChanged);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_kinds_are_independent() {
        let bus = ChangeBus::new(Duration::from_millis(150));
        let (_beads_sub, beads) = counting_subscription(&bus, ChangeKind::BeadsChanged);
        let (_disc_sub, discovery) = counting_subscription(&bus, ChangeKind::DiscoveryChanged);

        bus.publish_raw(ChangeKind::BeadsChanged);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(beads.load(Ordering::SeqCst), 1);
        assert_eq!(discovery.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiple_subscribers_per_kind() {
        let bus = ChangeBus::new(Duration::from_millis(150));
        let (_sub_a, count_a) = counting_subscription(&bus, ChangeKind::BeadsChanged);
        let (_sub_b, count_b) = counting_subscription(&bus, ChangeKind::BeadsChanged);

        bus.publish_raw(ChangeKind::BeadsChanged);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(count_a.load(Ordering::SeqCst), 1);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_is_idempotent() {
        let bus = ChangeBus::new(Duration::from_millis(150));
        let (sub, count) = counting_subscription(&bus, ChangeKind::BeadsChanged);

        sub.unsubscribe();
        sub.unsubscribe();

        bus.publish_raw(ChangeKind::BeadsChanged);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_leaves_other_subscribers() {
        let bus = ChangeBus::new(Duration::from_millis(150));
        let (sub_a, count_a) = counting_subscription(&bus, ChangeKind::DiscoveryChanged);
        let (_sub_b, count_b) = counting_subscription(&bus, ChangeKind::DiscoveryChanged);

        sub_a.unsubscribe();

        bus.publish_raw(ChangeKind::DiscoveryChanged);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(count_a.load(Ordering::SeqCst), 0);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ChangeKind::DiscoveryChanged.as_str(), "discovery-changed");
        assert_eq!(ChangeKind::BeadsChanged.as_str(), "beads-changed");
    }

    #[test]
    fn test_kind_from_target() {
        assert_eq!(
            ChangeKind::from(WatchTarget::Discovery),
            ChangeKind::DiscoveryChanged
        );
        assert_eq!(ChangeKind::from(WatchTarget::Beads), ChangeKind::BeadsChanged);
    }
}
