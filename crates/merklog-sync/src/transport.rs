//! Publish/subscribe bus shared by all peers.
//!
//! A bus fans every published event out to the subscribers of its channel,
//! the publisher included. Subscribers answer with the events they want
//! published next; the bus feeds those back in, so handlers never call into
//! the bus while it is delivering to them.

use std::fmt;
use std::sync::Arc;

use crate::messages::{Channel, SyncEvent};

/// Receives events from a bus.
pub trait Subscriber: Send + Sync {
    /// Handle one event and return the events to publish in response.
    fn deliver(&self, event: &SyncEvent) -> Vec<SyncEvent>;
}

/// Handle for a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Broadcast bus over the four sync channels.
///
/// Implementations must be thread-safe (Send + Sync). `publish` must not
/// wait on a handler that is already running.
pub trait Bus: Send + Sync {
    /// Publish an event to every subscriber of its channel.
    fn publish(&self, event: SyncEvent);

    /// Register a subscriber for the given channels.
    fn subscribe(&self, channels: &[Channel], subscriber: Arc<dyn Subscriber>) -> SubscriptionId;

    /// Remove a subscriber. Returns false if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// In-process bus with FIFO delivery.
///
/// Delivery is synchronous: the outermost `publish` call drains the queue,
/// handing each event to every matching subscriber in subscription order.
/// Events published while draining, from a handler or another thread, are
/// queued behind the current one.
pub mod memory {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    struct Subscription {
        id: SubscriptionId,
        channels: Vec<Channel>,
        subscriber: Arc<dyn Subscriber>,
    }

    #[derive(Default)]
    struct State {
        subscriptions: Vec<Subscription>,
        queue: VecDeque<SyncEvent>,
        draining: bool,
        history: Option<Vec<SyncEvent>>,
        delivered: u64,
    }

    impl State {
        fn enqueue(&mut self, event: SyncEvent) {
            if let Some(history) = &mut self.history {
                history.push(event.clone());
            }
            self.queue.push_back(event);
        }
    }

    /// In-memory bus for tests and single-process meshes.
    ///
    /// Only a bus built with [`MemoryBus::recording`] keeps a history of
    /// published events.
    #[derive(Default)]
    pub struct MemoryBus {
        state: Mutex<State>,
        next_id: AtomicU64,
    }

    impl MemoryBus {
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a bus that records every published event.
        pub fn recording() -> Self {
            let bus = Self::new();
            bus.lock().history = Some(Vec::new());
            bus
        }

        /// Create a bus ready to share between peers.
        pub fn shared() -> Arc<Self> {
            Arc::new(Self::new())
        }

        /// Create a recording bus ready to share between peers.
        pub fn shared_recording() -> Arc<Self> {
            Arc::new(Self::recording())
        }

        fn lock(&self) -> MutexGuard<'_, State> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        pub fn is_recording(&self) -> bool {
            self.lock().history.is_some()
        }

        /// Every event published so far, in publish order. Empty unless
        /// recording.
        pub fn history(&self) -> Vec<SyncEvent> {
            self.lock().history.clone().unwrap_or_default()
        }

        /// Published events on one channel, in publish order.
        pub fn history_on(&self, channel: Channel) -> Vec<SyncEvent> {
            self.lock()
                .history
                .iter()
                .flatten()
                .filter(|e| e.channel() == channel)
                .cloned()
                .collect()
        }

        pub fn clear_history(&self) {
            if let Some(history) = &mut self.lock().history {
                history.clear();
            }
        }

        /// Total number of (event, subscriber) deliveries made.
        pub fn delivered(&self) -> u64 {
            self.lock().delivered
        }

        pub fn subscriber_count(&self) -> usize {
            self.lock().subscriptions.len()
        }

        fn drain(&self) {
            let mut guard = DrainGuard { bus: self, armed: true };

            loop {
                let (event, targets) = {
                    let mut state = self.lock();
                    let Some(event) = state.queue.pop_front() else {
                        state.draining = false;
                        guard.armed = false;
                        return;
                    };
                    let targets: Vec<_> = state
                        .subscriptions
                        .iter()
                        .filter(|s| s.channels.contains(&event.channel()))
                        .map(|s| Arc::clone(&s.subscriber))
                        .collect();
                    state.delivered += targets.len() as u64;
                    (event, targets)
                };

                for subscriber in targets {
                    let responses = subscriber.deliver(&event);
                    if responses.is_empty() {
                        continue;
                    }
                    let mut state = self.lock();
                    for response in responses {
                        state.enqueue(response);
                    }
                }
            }
        }
    }

    /// Releases the drain role if a subscriber panics mid-delivery.
    struct DrainGuard<'a> {
        bus: &'a MemoryBus,
        armed: bool,
    }

    impl Drop for DrainGuard<'_> {
        fn drop(&mut self) {
            if self.armed {
                let mut state = self.bus.lock();
                state.draining = false;
                state.queue.clear();
            }
        }
    }

    impl Bus for MemoryBus {
        fn publish(&self, event: SyncEvent) {
            {
                let mut state = self.lock();
                state.enqueue(event);
                if state.draining {
                    return;
                }
                state.draining = true;
            }
            self.drain();
        }

        fn subscribe(&self, channels: &[Channel], subscriber: Arc<dyn Subscriber>) -> SubscriptionId {
            let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
            self.lock().subscriptions.push(Subscription {
                id,
                channels: channels.to_vec(),
                subscriber,
            });
            tracing::trace!("{} subscribed to {:?}", id, channels);
            id
        }

        fn unsubscribe(&self, id: SubscriptionId) -> bool {
            let mut state = self.lock();
            let before = state.subscriptions.len();
            state.subscriptions.retain(|s| s.id != id);
            state.subscriptions.len() != before
        }
    }

    impl fmt::Debug for MemoryBus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let state = self.lock();
            f.debug_struct("MemoryBus")
                .field("subscribers", &state.subscriptions.len())
                .field("queued", &state.queue.len())
                .field("recorded", &state.history.as_ref().map(Vec::len))
                .finish()
        }
    }
}

/// Bus over a Tokio broadcast channel.
///
/// Each subscriber runs on its own task and handles one event at a time.
/// A subscriber that falls more than `capacity` events behind skips the
/// oldest ones; later root advertisements re-drive whatever it missed.
pub mod channel {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use tokio::runtime::Handle;
    use tokio::sync::broadcast::{self, error::RecvError};
    use tokio::task::JoinHandle;

    use crate::error::{Result, SyncError};

    pub struct ChannelBus {
        tx: broadcast::Sender<SyncEvent>,
        handle: Handle,
        tasks: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
        next_id: AtomicU64,
    }

    impl ChannelBus {
        pub const DEFAULT_CAPACITY: usize = 1024;

        /// Create a bus whose subscriber tasks run on the current runtime.
        pub fn new(capacity: usize) -> Result<Self> {
            let handle = Handle::try_current()
                .map_err(|e| SyncError::TransportError(format!("no tokio runtime: {}", e)))?;
            Ok(Self::with_handle(capacity, handle))
        }

        pub fn with_handle(capacity: usize, handle: Handle) -> Self {
            let (tx, _) = broadcast::channel(capacity.max(1));
            Self {
                tx,
                handle,
                tasks: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }
        }

        fn tasks(&self) -> MutexGuard<'_, HashMap<SubscriptionId, JoinHandle<()>>> {
            self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
        }

        pub fn subscriber_count(&self) -> usize {
            self.tasks().len()
        }
    }

    async fn run_subscriber(
        id: SubscriptionId,
        channels: Vec<Channel>,
        subscriber: Arc<dyn Subscriber>,
        mut rx: broadcast::Receiver<SyncEvent>,
        tx: broadcast::Sender<SyncEvent>,
    ) {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !channels.contains(&event.channel()) {
                        continue;
                    }
                    for response in subscriber.deliver(&event) {
                        // Err means no receivers are left
                        let _ = tx.send(response);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("{} lagged, skipped {} events", id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    impl Bus for ChannelBus {
        fn publish(&self, event: SyncEvent) {
            if self.tx.send(event).is_err() {
                tracing::trace!("published with no subscribers");
            }
        }

        fn subscribe(&self, channels: &[Channel], subscriber: Arc<dyn Subscriber>) -> SubscriptionId {
            let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
            let rx = self.tx.subscribe();
            let task = self.handle.spawn(run_subscriber(
                id,
                channels.to_vec(),
                subscriber,
                rx,
                self.tx.clone(),
            ));
            self.tasks().insert(id, task);
            id
        }

        fn unsubscribe(&self, id: SubscriptionId) -> bool {
            match self.tasks().remove(&id) {
                Some(task) => {
                    task.abort();
                    true
                }
                None => false,
            }
        }
    }

    impl Drop for ChannelBus {
        fn drop(&mut self) {
            for (_, task) in self.tasks().drain() {
                task.abort();
            }
        }
    }

    impl fmt::Debug for ChannelBus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("ChannelBus")
                .field("subscribers", &self.subscriber_count())
                .finish()
        }
    }
}
