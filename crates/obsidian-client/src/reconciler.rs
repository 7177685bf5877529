//! Bounded, receipt-ordered feeds of circuit events.
//!
//! Each view owns its own [`EventReconciler`]. Events are prepended in the
//! order the channel delivers them and the oldest entry falls off once the
//! feed is full. Feeds are informational only; they never touch snapshot
//! entities.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use obsidian_proto::{CircuitEvent, ServiceId, CIRCUIT_STATE_CHANGE};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::channel::{HandlerId, TransportChannel};

/// Default number of entries kept per feed.
pub const FEED_CAPACITY: usize = 10;

/// One received event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Client-assigned id, unique per receipt. The backend id, if any, stays
    /// on [`CircuitEvent::id`].
    pub receipt_id: String,
    /// When this client received the event.
    pub received_at: DateTime<Utc>,
    /// The event as delivered.
    pub event: CircuitEvent,
}

impl FeedEntry {
    /// Stamp an event with a fresh receipt id and the receipt time.
    #[must_use]
    pub fn receive(event: CircuitEvent) -> Self {
        Self {
            receipt_id: Uuid::new_v4().to_string(),
            received_at: Utc::now(),
            event,
        }
    }
}

/// Fixed-capacity list, newest first.
#[derive(Debug, Clone)]
pub struct EventFeed {
    entries: VecDeque<FeedEntry>,
    capacity: usize,
}

impl EventFeed {
    /// Create an empty feed. A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend an entry, evicting the oldest beyond capacity.
    pub fn push(&mut self, entry: FeedEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the feed is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new(FEED_CAPACITY)
    }
}

#[derive(Debug)]
struct FeedShared {
    state: Mutex<FeedState>,
    version: watch::Sender<u64>,
}

#[derive(Debug)]
struct FeedState {
    feed: EventFeed,
    active: bool,
}

impl FeedShared {
    fn record(&self, event: CircuitEvent) {
        {
            let mut state = self.state.lock();
            if !state.active {
                return;
            }
            state.feed.push(FeedEntry::receive(event));
        }
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}

/// Subscribes a view to circuit events and keeps its bounded feed.
///
/// Dropping the reconciler unsubscribes it.
#[derive(Debug)]
pub struct EventReconciler {
    channel: TransportChannel,
    scope: Option<ServiceId>,
    shared: Arc<FeedShared>,
    updates: watch::Receiver<u64>,
    subscription: Option<HandlerId>,
}

impl EventReconciler {
    /// Reconciler for events of every service.
    #[must_use]
    pub fn new(channel: &TransportChannel) -> Self {
        Self::build(channel, None, FEED_CAPACITY)
    }

    /// Reconciler that only keeps events for `service_id`.
    #[must_use]
    pub fn scoped(channel: &TransportChannel, service_id: impl Into<ServiceId>) -> Self {
        Self::build(channel, Some(service_id.into()), FEED_CAPACITY)
    }

    /// Replace the feed capacity. Existing entries are discarded.
    #[must_use]
    pub fn with_capacity(self, capacity: usize) -> Self {
        {
            let mut state = self.shared.state.lock();
            state.feed = EventFeed::new(capacity);
        }
        self
    }

    fn build(channel: &TransportChannel, scope: Option<ServiceId>, capacity: usize) -> Self {
        let (version, updates) = watch::channel(0);
        Self {
            channel: channel.clone(),
            scope,
            shared: Arc::new(FeedShared {
                state: Mutex::new(FeedState {
                    feed: EventFeed::new(capacity),
                    active: false,
                }),
                version,
            }),
            updates,
            subscription: None,
        }
    }

    /// Start receiving events. Calling it again while subscribed does nothing.
    pub fn subscribe(&mut self) {
        if self.subscription.is_some() {
            return;
        }

        self.shared.state.lock().active = true;

        let shared = Arc::clone(&self.shared);
        let scope = self.scope.clone();
        let id = self.channel.on(CIRCUIT_STATE_CHANGE, move |data: &Value| {
            let event: CircuitEvent = match serde_json::from_value(data.clone()) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "skipping undecodable circuit event");
                    return;
                }
            };

            if let Some(scope) = &scope {
                if event.service_id != *scope {
                    return;
                }
            }

            debug!(service_id = %event.service_id, state = %event.state, "circuit event received");
            shared.record(event);
        });

        self.subscription = Some(id);
    }

    /// Stop receiving events and discard the feed.
    pub fn unsubscribe(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.channel.off(CIRCUIT_STATE_CHANGE, id);
        }

        let mut state = self.shared.state.lock();
        state.active = false;
        state.feed.clear();
    }

    /// Whether the reconciler is currently subscribed.
    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Service this reconciler is restricted to, if any.
    #[must_use]
    pub const fn scope(&self) -> Option<&ServiceId> {
        self.scope.as_ref()
    }

    /// Copy of the feed, newest first.
    #[must_use]
    pub fn entries(&self) -> Vec<FeedEntry> {
        self.shared.state.lock().feed.iter().cloned().collect()
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().feed.len()
    }

    /// Whether the feed is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.state.lock().feed.capacity()
    }

    /// Wait until a new entry has been recorded since the last call.
    pub async fn changed(&mut self) {
        // The sender lives in `self.shared`, so this never errors.
        let _ = self.updates.changed().await;
    }
}

impl Drop for EventReconciler {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
