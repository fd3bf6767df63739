//! Event emission.
//!
//! Waitlist notifications are wrapped in an [`Event`] envelope and broadcast
//! to every subscriber. RPC clients hold a subscription id and drain their
//! buffer with `poll_events`; a subscriber that falls behind by more than the
//! buffer capacity loses the oldest events and is told how many.
//!
//! Open subscriptions are bounded. A subscription not polled within the idle
//! timeout is dropped the next time a client subscribes, and a subscribe past
//! the limit fails.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tracing::{debug, warn};
use waitlist_core::Notifier;
use waitlist_types::events::{Event, EventType, WaitlistEvent};

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Only these event types. `None` = all.
    #[serde(default)]
    pub event_types: Option<Vec<EventType>>,
    /// Only events about this entrant.
    #[serde(default)]
    pub entrant_id: Option<String>,
}

/// Events drained from one subscription.
#[derive(Debug, Clone, Serialize)]
pub struct Drained {
    pub events: Vec<Event>,
    /// Events dropped because the subscriber fell behind.
    pub lagged: u64,
}

/// Default cap on open polling subscriptions.
pub const DEFAULT_MAX_SUBSCRIPTIONS: usize = 64;

/// Default time a subscription may go unpolled before it is dropped.
pub const DEFAULT_SUBSCRIPTION_IDLE: Duration = Duration::from_secs(600);

/// Subscription could not be opened.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("too many open subscriptions (limit {0})")]
    Limit(usize),
}

struct Subscription {
    filter: EventFilter,
    receiver: broadcast::Receiver<Event>,
    last_polled: Instant,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
    subscriptions: Arc<Mutex<HashMap<String, Subscription>>>,
    max_subscriptions: usize,
    idle_timeout: Duration,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            max_subscriptions: DEFAULT_MAX_SUBSCRIPTIONS,
            idle_timeout: DEFAULT_SUBSCRIPTION_IDLE,
        }
    }

    /// Bound the polling subscriptions: at most `max` open at once, each
    /// dropped after `idle_timeout` without a poll.
    pub fn with_subscription_limits(mut self, max: usize, idle_timeout: Duration) -> Self {
        self.max_subscriptions = max.max(1);
        self.idle_timeout = idle_timeout;
        self
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Open a named subscription for polling clients.
    ///
    /// Idle subscriptions are swept first; fails when the limit is still
    /// reached afterwards.
    pub async fn open_subscription(&self, filter: EventFilter) -> Result<String, SubscriptionError> {
        let mut subscriptions = self.subscriptions.lock().await;

        let now = Instant::now();
        let before = subscriptions.len();
        subscriptions.retain(|_, sub| now.duration_since(sub.last_polled) < self.idle_timeout);
        if subscriptions.len() < before {
            debug!(dropped = before - subscriptions.len(), "idle subscriptions dropped");
        }
        if subscriptions.len() >= self.max_subscriptions {
            warn!(limit = self.max_subscriptions, "subscription limit reached");
            return Err(SubscriptionError::Limit(self.max_subscriptions));
        }

        let mut id = [0u8; 16];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut id);
        let id = hex::encode(id);
        let subscription = Subscription {
            filter,
            receiver: self.subscribe(),
            last_polled: now,
        };
        subscriptions.insert(id.clone(), subscription);
        Ok(id)
    }

    /// Number of open polling subscriptions.
    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.lock().await.len()
    }

    /// Drain up to `max` matching events. `None` for an unknown id.
    pub async fn drain(&self, subscription_id: &str, max: usize) -> Option<Drained> {
        let mut subscriptions = self.subscriptions.lock().await;
        let subscription = subscriptions.get_mut(subscription_id)?;
        subscription.last_polled = Instant::now();
        let mut drained = Drained {
            events: Vec::new(),
            lagged: 0,
        };
        while drained.events.len() < max {
            match subscription.receiver.try_recv() {
                Ok(event) => {
                    if subscription.filter.matches(&event) {
                        drained.events.push(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    drained.lagged += skipped;
                }
                Err(_) => break,
            }
        }
        Some(drained)
    }

    /// Close a subscription. Returns whether it existed.
    pub async fn close_subscription(&self, subscription_id: &str) -> bool {
        self.subscriptions.lock().await.remove(subscription_id).is_some()
    }
}

impl Notifier for EventBus {
    fn notify(&self, event: WaitlistEvent) {
        self.emit(event.into_event(crate::now()));
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref types) = self.event_types {
            if !types.contains(&event.event_type) {
                return false;
            }
        }

        if let Some(ref entrant_id) = self.entrant_id {
            match event.payload.get("entrant_id").and_then(|v| v.as_str()) {
                Some(id) if id == entrant_id => {}
                _ => return false,
            }
        }

        true
    }
}
