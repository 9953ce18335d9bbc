//! The Peer: one participant in a sync mesh.
//!
//! A peer owns its log, subscribes to every channel of a shared [`Bus`] and
//! answers events through a [`Replica`]. Local sends append and advertise
//! the new root; everything else is driven by the events that follow.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use merklog_core::{ContentHash, Message, PeerId, Snapshot};
use merklog_sync::{Bus, Channel, Replica, Subscriber, SubscriptionId, SyncConfig, SyncEvent};

use crate::error::{PeerError, Result};

/// Configuration for a Peer.
#[derive(Debug, Clone, Default)]
pub struct PeerConfig {
    /// Sync configuration.
    pub sync: SyncConfig,
}

/// Handle for a registered log listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback run after every append with the new state of the log.
pub type LogListener = dyn Fn(&Snapshot) + Send + Sync;

/// State shared between the peer handle and its bus subscription.
struct Shared {
    id: PeerId,
    replica: Mutex<Replica>,
    listeners: Mutex<Vec<(ListenerId, Arc<LogListener>)>>,
    next_listener: AtomicU64,
    shut_down: AtomicBool,
}

impl Shared {
    fn replica(&self) -> MutexGuard<'_, Replica> {
        self.replica.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(ListenerId, Arc<LogListener>)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Run listeners without holding any peer lock, so a listener may call
    /// back into the peer.
    fn notify(&self, snapshot: &Snapshot) {
        if self.is_shut_down() {
            return;
        }
        let listeners: Vec<_> = self
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }
}

impl Subscriber for Shared {
    fn deliver(&self, event: &SyncEvent) -> Vec<SyncEvent> {
        if self.is_shut_down() {
            return Vec::new();
        }

        let (step, snapshot) = {
            let mut replica = self.replica();
            let step = replica.handle(event);
            let snapshot = step.log_changed().then(|| replica.log().snapshot());
            (step, snapshot)
        };

        if let Some(snapshot) = snapshot {
            self.notify(&snapshot);
        }
        step.outbound
    }
}

/// A peer in a sync mesh.
///
/// Dropping the peer shuts it down.
pub struct Peer {
    shared: Arc<Shared>,
    bus: Arc<dyn Bus>,
    subscription: SubscriptionId,
}

impl Peer {
    /// Create a peer and subscribe it to all four channels of `bus`.
    pub fn new(id: PeerId, bus: Arc<dyn Bus>, config: PeerConfig) -> Self {
        let shared = Arc::new(Shared {
            id: id.clone(),
            replica: Mutex::new(Replica::new(id, config.sync)),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        });

        let subscription = bus.subscribe(&Channel::ALL, shared.clone());
        tracing::debug!("{} joined the bus as {}", shared.id, subscription);

        Self {
            shared,
            bus,
            subscription,
        }
    }

    pub fn id(&self) -> &PeerId {
        &self.shared.id
    }

    /// Author a message, append it and advertise the new root.
    ///
    /// Returns the message as stored. Sending a message equal to one already
    /// in the log (same text and author within the same millisecond) leaves the
    /// log unchanged and notifies no listener.
    pub fn send_message(&self, text: impl Into<String>) -> Result<Message> {
        self.ensure_running()?;

        let message = Message::new(self.shared.id.clone(), text);
        let (root, snapshot) = {
            let mut replica = self.shared.replica();
            let appended = replica.append_local(message.clone()).is_appended();
            let snapshot = appended.then(|| replica.log().snapshot());
            (replica.root_event(), snapshot)
        };

        if let Some(snapshot) = snapshot {
            self.shared.notify(&snapshot);
        }
        self.publish_root(root);
        Ok(message)
    }

    /// Re-advertise the current root to restart reconciliation.
    pub fn sync(&self) -> Result<()> {
        self.ensure_running()?;
        let root = self.shared.replica().root_event();
        self.publish_root(root);
        Ok(())
    }

    /// Register a listener for log changes.
    ///
    /// Listeners run synchronously after each append, local or remote, in
    /// registration order.
    pub fn on_log_changed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::Relaxed));
        self.shared.listeners().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.shared.listeners();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// The log in arrival order.
    pub fn messages(&self) -> Snapshot {
        self.shared.replica().log().snapshot()
    }

    /// Root hash of the current log, `None` while empty.
    pub fn root_hash(&self) -> Option<ContentHash> {
        self.shared.replica().root_hash()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.is_shut_down()
    }

    /// Leave the bus and stop notifying listeners. Idempotent.
    pub fn shutdown(&self) {
        if self.shared.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.bus.unsubscribe(self.subscription);
        self.shared.listeners().clear();
        tracing::debug!("{} shut down", self.shared.id);
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(PeerError::ShutDown(self.shared.id.to_string()));
        }
        Ok(())
    }

    fn publish_root(&self, root: SyncEvent) {
        if let SyncEvent::Root(hash) = &root {
            tracing::debug!(
                "{} advertising root {:?} ({} messages)",
                self.shared.id,
                hash,
                self.shared.replica().log().len()
            );
        }
        self.bus.publish(root);
    }
}

impl Drop for Peer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.shared.id)
            .field("subscription", &self.subscription)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
