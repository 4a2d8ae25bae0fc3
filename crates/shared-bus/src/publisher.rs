//! # Event Manager
//!
//! Defines the hand-off side of the event bus.
//!
//! Producers `put` events onto a bounded queue and return immediately; a
//! single drain task moves queued events to the broadcast channel that
//! subscriptions read from.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::{Event, EventFilter};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Errors from handing an event to the bus.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// The bus was shut down.
    #[error("Event bus closed")]
    Closed,

    /// The queue is at capacity.
    #[error("Event queue full (capacity {0})")]
    Full(usize),
}

/// Process-wide event sink.
///
/// `put` is a fire-and-forget hand-off: it never waits for delivery.
pub trait EventManager: Send + Sync {
    /// Queue an event for asynchronous delivery.
    fn put(&self, event: Event) -> Result<(), EventBusError>;
}

/// In-memory implementation of the event bus.
///
/// Must be created with [`InMemoryEventBus::start`] inside a tokio runtime
/// and torn down with [`InMemoryEventBus::shutdown`], which drains whatever
/// is still queued before returning.
pub struct InMemoryEventBus {
    /// Queue producer. `None` once shut down.
    queue: Mutex<Option<mpsc::Sender<Event>>>,

    /// Broadcast sender feeding subscriptions.
    sender: broadcast::Sender<Event>,

    /// Drain task handle. `None` once joined.
    drain: Mutex<Option<JoinHandle<()>>>,

    /// Total events accepted by `put`.
    events_published: AtomicU64,

    /// Total events delivered to at least one subscriber.
    events_delivered: Arc<AtomicU64>,

    /// Queue capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Start a bus with default capacity.
    #[must_use]
    pub fn start() -> Arc<Self> {
        Self::start_with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Start a bus with the given queue capacity and spawn its drain task.
    #[must_use]
    pub fn start_with_capacity(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        let (queue_tx, mut queue_rx) = mpsc::channel::<Event>(capacity);
        let (sender, _) = broadcast::channel(capacity);
        let events_delivered = Arc::new(AtomicU64::new(0));

        let drain_sender = sender.clone();
        let delivered = Arc::clone(&events_delivered);
        let drain = tokio::spawn(async move {
            while let Some(event) = queue_rx.recv().await {
                let name = event.name;
                match drain_sender.send(event) {
                    Ok(receivers) => {
                        delivered.fetch_add(1, Ordering::Relaxed);
                        debug!(event = %name, receivers, "Event delivered");
                    }
                    Err(_) => debug!(event = %name, "Event dropped (no subscribers)"),
                }
            }
            debug!("Event drain task finished");
        });

        info!(capacity, "Event bus started");

        Arc::new(Self {
            queue: Mutex::new(Some(queue_tx)),
            sender,
            drain: Mutex::new(Some(drain)),
            events_published: AtomicU64::new(0),
            events_delivered,
            capacity,
        })
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(kinds = ?filter.kinds, "New subscription created");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Stop accepting events, deliver everything already queued, then join
    /// the drain task. Calling it again is a no-op.
    pub async fn shutdown(&self) {
        // Dropping the only producer ends the drain loop once the queue is empty.
        let producer = self.queue.lock().take();
        drop(producer);

        let handle = self.drain.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Event drain task ended abnormally");
            }
            info!(
                published = self.events_published(),
                delivered = self.events_delivered(),
                "Event bus drained"
            );
        }
    }

    /// Whether `shutdown` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.queue.lock().is_none()
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the queue capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total events accepted by `put`.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    /// Total events handed to at least one subscriber.
    #[must_use]
    pub fn events_delivered(&self) -> u64 {
        self.events_delivered.load(Ordering::Relaxed)
    }
}

impl EventManager for InMemoryEventBus {
    fn put(&self, event: Event) -> Result<(), EventBusError> {
        let guard = self.queue.lock();
        let Some(queue) = guard.as_ref() else {
            return Err(EventBusError::Closed);
        };

        match queue.try_send(event) {
            Ok(()) => {
                self.events_published.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(event = %event.name, capacity = self.capacity, "Event queue full");
                Err(EventBusError::Full(self.capacity))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(EventBusError::Closed),
        }
    }
}
